//! CPU reference integrator
//!
//! Runs the same softened all-pairs gravity and semi-implicit Euler step as
//! the compute kernel. Used as the oracle for the GPU path and for tests.

use cgmath::{InnerSpace, Vector3, Zero};

use super::particles::ParticleState;
use crate::config::SimulationConfig;

fn xyz(v: &[f32; 4]) -> Vector3<f32> {
    Vector3::new(v[0], v[1], v[2])
}

/// Gravitational acceleration of every particle
pub fn compute_accelerations(positions: &[[f32; 4]], config: &SimulationConfig) -> Vec<Vector3<f32>> {
    let strength = config.gravitational_constant * config.particle_mass();
    let softening_sq = config.softening * config.softening;

    positions
        .iter()
        .map(|pi| {
            let pi = xyz(pi);
            let mut total = Vector3::zero();
            for pj in positions {
                let displacement = xyz(pj) - pi;
                let distance_sq = displacement.magnitude2() + softening_sq;
                // Coincident particles (including j == i) contribute nothing
                if distance_sq > 0.0 {
                    total += displacement / (distance_sq * distance_sq.sqrt());
                }
            }
            total * strength
        })
        .collect()
}

/// Advances the state by one time step
///
/// All velocities are updated before any position moves.
pub fn step(state: &mut ParticleState, config: &SimulationConfig) {
    let dt = config.time_step;
    let accelerations = compute_accelerations(&state.positions, config);

    for (velocity, acceleration) in state.velocities.iter_mut().zip(&accelerations) {
        velocity[0] += acceleration.x * dt;
        velocity[1] += acceleration.y * dt;
        velocity[2] += acceleration.z * dt;
    }

    for (position, velocity) in state.positions.iter_mut().zip(&state.velocities) {
        position[0] += velocity[0] * dt;
        position[1] += velocity[1] * dt;
        position[2] += velocity[2] * dt;
    }
}

pub fn run(state: &mut ParticleState, config: &SimulationConfig, steps: u32) {
    for _ in 0..steps {
        step(state, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(count: u32) -> SimulationConfig {
        SimulationConfig {
            particle_count: count,
            softening: 0.0,
            time_step: 0.01,
            seed: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_particle_stays_put() {
        let mut state = ParticleState::from_xyz(&[[0.3, -0.2, 0.1]], &[[0.0; 3]]);
        run(&mut state, &config(1), 100);
        assert_eq!(state.positions[0], [0.3, -0.2, 0.1, 1.0]);
        assert_eq!(state.velocities[0], [0.0; 4]);
    }

    #[test]
    fn test_two_bodies_attract_symmetrically() {
        let mut state =
            ParticleState::from_xyz(&[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &[[0.0; 3], [0.0; 3]]);
        let config = config(2);

        let acc = compute_accelerations(&state.positions, &config);
        // G = 1, m = 0.5, r = 2: |a| = 0.5 / 4
        assert_relative_eq!(acc[0].x, 0.125, epsilon = 1e-6);
        assert_relative_eq!(acc[1].x, -0.125, epsilon = 1e-6);
        assert_relative_eq!(acc[0].y, 0.0);

        step(&mut state, &config);
        assert!(state.positions[0][0] > -1.0);
        assert_relative_eq!(state.positions[0][0], -state.positions[1][0], epsilon = 1e-6);
        assert_relative_eq!(state.velocities[0][0], 0.125 * 0.01, epsilon = 1e-7);
    }

    #[test]
    fn test_semi_implicit_position_uses_new_velocity() {
        let mut state =
            ParticleState::from_xyz(&[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &[[0.0; 3], [0.0; 3]]);
        step(&mut state, &config(2));
        // v = a dt, x += v dt
        assert_relative_eq!(state.positions[0][0], -1.0 + 0.125 * 0.01 * 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_softening_weakens_close_encounters() {
        let positions = [[0.0, 0.0, 0.0, 1.0], [0.01, 0.0, 0.0, 1.0]];
        let hard = compute_accelerations(&positions, &config(2));
        let soft = compute_accelerations(
            &positions,
            &SimulationConfig {
                softening: 0.1,
                ..config(2)
            },
        );
        assert!(soft[0].x < hard[0].x);
        assert!(soft[0].x > 0.0);
    }

    #[test]
    fn test_momentum_is_conserved() {
        let mut state = ParticleState::random(&config(32));
        let config = SimulationConfig {
            softening: 0.05,
            ..config(32)
        };
        run(&mut state, &config, 20);

        let momentum = state
            .velocities
            .iter()
            .fold(Vector3::zero(), |acc, v| acc + xyz(v));
        assert_relative_eq!(momentum.magnitude(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_w_components_untouched() {
        let mut state = ParticleState::random(&config(16));
        run(&mut state, &SimulationConfig { softening: 0.05, ..config(16) }, 5);
        assert!(state.positions.iter().all(|p| p[3] == 1.0));
        assert!(state.velocities.iter().all(|v| v[3] == 0.0));
    }
}
