//! Error types shared across the crate

use thiserror::Error;

use crate::config::ConfigError;
use crate::gfx::vertex_out::VertexOutError;

#[derive(Debug, Error)]
pub enum GravisimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid vertex output: {0}")]
    VertexOut(#[from] VertexOutError),

    #[error("no compatible GPU adapter: {0}")]
    AdapterUnavailable(#[from] wgpu::RequestAdapterError),

    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("{count} particles exceed the device limit of {max}")]
    TooManyParticles { count: usize, max: u32 },

    #[error("surface has no supported texture format")]
    NoSurfaceFormat,

    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("failed to map GPU buffer for reading: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("buffer map callback was dropped before completing")]
    BufferMapCancelled,

    #[error("failed to wait for GPU: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("event loop failure: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    CreateWindow(#[from] winit::error::OsError),

    #[error("failed to prepare UI frame: {0}")]
    UiFrame(#[from] winit::error::ExternalError),

    #[error("failed to render UI: {0}")]
    UiRender(String),
}

pub type Result<T> = std::result::Result<T, GravisimError>;
