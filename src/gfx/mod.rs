//! # Graphics Module
//!
//! Everything that touches the GPU for drawing: device acquisition, the
//! orbit camera, the particle pipeline and the per-frame render engine.
//!
//! - **Stage interface** ([`vertex_out`]) - the record the particle vertex
//!   stage hands to the fragment stage
//! - **Camera** ([`camera`]) - projection, view and orbit controls
//! - **Particles** ([`particle_renderer`]) - point sprites coloured by speed
//! - **Frames** ([`render_engine`]) - surface management and pass ordering

pub mod camera;
pub mod context;
pub mod particle_renderer;
pub mod render_engine;
pub mod texture;
pub mod vertex_out;

pub use camera::{CameraController, OrbitCamera};
pub use context::GpuContext;
pub use render_engine::RenderEngine;
pub use vertex_out::{StageBinding, VertexOut};
