//! Offscreen runs
//!
//! Steps the GPU simulation without a window and reports the conservation
//! diagnostics before and after. The final state is pushed through the host
//! mirror of the particle vertex stage so every [`VertexOut`] is checked.
//! Small systems are also replayed on the CPU integrator and compared
//! particle by particle.
//!
//! [`VertexOut`]: crate::gfx::VertexOut

use crate::{
    config::AppConfig,
    error::Result,
    gfx::{context::GpuContext, particle_renderer::ParticleUniforms, OrbitCamera},
    simulation::{cpu, NBodySimulation, ParticleState, SystemStatistics},
};

/// Largest particle count replayed on the CPU for comparison
const CPU_CHECK_LIMIT: u32 = 1024;

#[derive(Debug, Clone)]
pub struct HeadlessReport {
    pub steps: u32,
    pub initial: SystemStatistics,
    pub last: SystemStatistics,
    /// Largest distance between GPU and CPU positions, when checked.
    pub max_cpu_deviation: Option<f32>,
}

pub fn run(config: &AppConfig, steps: u32) -> Result<HeadlessReport> {
    let context = pollster::block_on(GpuContext::headless())?;
    let sim_config = &config.simulation;

    let state = ParticleState::random(sim_config);
    let initial = SystemStatistics::calculate(&state, sim_config);
    initial.log_summary("initial");

    let simulation = NBodySimulation::new(&context.device, sim_config, &state)?;
    simulation.run_steps(&context.device, &context.queue, steps);
    let gpu_state = simulation.read_state(&context.device, &context.queue)?;

    let last = SystemStatistics::calculate(&gpu_state, sim_config);
    last.log_summary(&format!("after {steps} steps"));
    log::info!("Relative energy drift: {:.3e}", last.energy_drift(&initial));

    let render = &config.render;
    let uniforms = ParticleUniforms::new(
        &OrbitCamera::from_config(render),
        render.width,
        render.height,
        render,
    );
    check_vertex_outputs(&uniforms, &gpu_state)?;

    let max_cpu_deviation = (sim_config.particle_count <= CPU_CHECK_LIMIT).then(|| {
        let mut reference = state.clone();
        cpu::run(&mut reference, sim_config, steps);
        let deviation = max_position_deviation(&gpu_state, &reference);
        log::info!("Largest GPU/CPU position deviation: {deviation:.3e}");
        deviation
    });

    Ok(HeadlessReport {
        steps,
        initial,
        last,
        max_cpu_deviation,
    })
}

/// Fails on the first particle whose vertex output could not be rasterized
fn check_vertex_outputs(uniforms: &ParticleUniforms, state: &ParticleState) -> Result<()> {
    for (position, velocity) in state.positions.iter().zip(&state.velocities) {
        uniforms.vertex_out(*position, *velocity, 0).validate()?;
    }
    Ok(())
}

fn max_position_deviation(a: &ParticleState, b: &ParticleState) -> f32 {
    a.positions
        .iter()
        .zip(&b.positions)
        .map(|(p, q)| {
            let dx = p[0] - q[0];
            let dy = p[1] - q[1];
            let dz = p[2] - q[2];
            (dx * dx + dy * dy + dz * dz).sqrt()
        })
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RenderConfig, error::GravisimError, gfx::vertex_out::VertexOutError};

    fn default_uniforms() -> ParticleUniforms {
        let render = RenderConfig::default();
        ParticleUniforms::new(&OrbitCamera::from_config(&render), 1200, 800, &render)
    }

    #[test]
    fn test_vertex_outputs_of_finite_state_are_valid() {
        let state = ParticleState::from_xyz(
            &[[0.0; 3], [0.5, -0.5, 0.25]],
            &[[0.1, 0.0, 0.0], [0.0; 3]],
        );
        assert!(check_vertex_outputs(&default_uniforms(), &state).is_ok());
    }

    #[test]
    fn test_non_finite_position_fails_vertex_check() {
        let state = ParticleState::from_xyz(
            &[[0.0; 3], [f32::NAN, 0.0, 0.0]],
            &[[0.0; 3]; 2],
        );
        let err = check_vertex_outputs(&default_uniforms(), &state).unwrap_err();
        assert!(matches!(
            err,
            GravisimError::VertexOut(VertexOutError::NonFinitePosition(_))
        ));
    }

    #[test]
    fn test_max_position_deviation() {
        let a = ParticleState::from_xyz(&[[0.0; 3], [1.0, 0.0, 0.0]], &[[0.0; 3]; 2]);
        let b = ParticleState::from_xyz(&[[0.0, 0.0, 0.5], [1.0, 2.0, 0.0]], &[[0.0; 3]; 2]);
        assert_eq!(max_position_deviation(&a, &b), 2.0);
        assert_eq!(max_position_deviation(&a, &a), 0.0);
    }
}
