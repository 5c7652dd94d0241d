//! # User Interface Module
//!
//! Dear ImGui overlay drawn on top of the particle view. The only panel is
//! the frames-per-second badge rendered by
//! [`PerformanceMonitor::render_overlay`](crate::performance::PerformanceMonitor::render_overlay).

pub mod manager;

pub use manager::UiManager;
