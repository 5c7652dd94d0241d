//! Particle simulation
//!
//! The GPU path in [`gpu`] drives the visualizer; [`cpu`] runs the same maths
//! on the host and is used to check it.

pub mod cpu;
pub mod gpu;
pub mod particles;
pub mod stats;

pub use gpu::NBodySimulation;
pub use particles::ParticleState;
pub use stats::SystemStatistics;
