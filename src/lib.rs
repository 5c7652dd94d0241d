//! gravisim
//!
//! Real-time GPU n-body gravity visualizer built on wgpu and winit.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod headless;
pub mod performance;
pub mod simulation;
pub mod ui;
pub mod wgpu_utils;

pub use config::AppConfig;
pub use error::{GravisimError, Result};
pub use gfx::vertex_out::VertexOut;
