//! Conservation diagnostics for a particle state

use cgmath::{InnerSpace, Vector3, Zero};

use super::particles::ParticleState;
use crate::config::SimulationConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemStatistics {
    pub kinetic_energy: f32,
    /// Softened pairwise potential, counting every pair once.
    pub potential_energy: f32,
    pub total_energy: f32,
    pub total_momentum: Vector3<f32>,
    pub center_of_mass: Vector3<f32>,
}

impl SystemStatistics {
    pub fn calculate(state: &ParticleState, config: &SimulationConfig) -> Self {
        let mass = config.particle_mass();
        let softening_sq = config.softening * config.softening;

        let mut kinetic_energy = 0.0;
        let mut total_momentum = Vector3::zero();
        let mut center_of_mass = Vector3::zero();

        for (p, v) in state.positions.iter().zip(&state.velocities) {
            let velocity = Vector3::new(v[0], v[1], v[2]);
            kinetic_energy += 0.5 * mass * velocity.magnitude2();
            total_momentum += velocity * mass;
            center_of_mass += Vector3::new(p[0], p[1], p[2]);
        }
        if !state.is_empty() {
            center_of_mass /= state.len() as f32;
        }

        let mut potential_energy = 0.0;
        for (i, pi) in state.positions.iter().enumerate() {
            for pj in &state.positions[i + 1..] {
                let displacement = Vector3::new(pj[0] - pi[0], pj[1] - pi[1], pj[2] - pi[2]);
                let distance = (displacement.magnitude2() + softening_sq).sqrt();
                if distance > 0.0 {
                    potential_energy -= config.gravitational_constant * mass * mass / distance;
                }
            }
        }

        Self {
            kinetic_energy,
            potential_energy,
            total_energy: kinetic_energy + potential_energy,
            total_momentum,
            center_of_mass,
        }
    }

    /// Relative change of total energy from `initial` to `self`
    pub fn energy_drift(&self, initial: &SystemStatistics) -> f32 {
        if initial.total_energy == 0.0 {
            return self.total_energy.abs();
        }
        ((self.total_energy - initial.total_energy) / initial.total_energy).abs()
    }

    pub fn log_summary(&self, label: &str) {
        log::info!(
            "{label}: E={:.6} (K={:.6}, U={:.6}) |p|={:.3e} com=({:.4}, {:.4}, {:.4})",
            self.total_energy,
            self.kinetic_energy,
            self.potential_energy,
            self.total_momentum.magnitude(),
            self.center_of_mass.x,
            self.center_of_mass.y,
            self.center_of_mass.z,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::cpu;
    use approx::assert_relative_eq;

    fn two_body_config() -> SimulationConfig {
        SimulationConfig {
            particle_count: 2,
            total_mass: 2.0,
            softening: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_known_energies() {
        let state =
            ParticleState::from_xyz(&[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &[[0.0, 2.0, 0.0], [0.0, -2.0, 0.0]]);
        let stats = SystemStatistics::calculate(&state, &two_body_config());

        // m = 1 each: K = 2 * 0.5 * 4, U = -1 * 1 * 1 / 2
        assert_relative_eq!(stats.kinetic_energy, 4.0);
        assert_relative_eq!(stats.potential_energy, -0.5);
        assert_relative_eq!(stats.total_energy, 3.5);
        assert_relative_eq!(stats.total_momentum, Vector3::zero());
        assert_relative_eq!(stats.center_of_mass, Vector3::zero());
    }

    #[test]
    fn test_softening_in_potential() {
        let state = ParticleState::from_xyz(&[[0.0; 3], [0.0; 3]], &[[0.0; 3], [0.0; 3]]);
        let config = SimulationConfig {
            softening: 0.5,
            ..two_body_config()
        };
        let stats = SystemStatistics::calculate(&state, &config);
        assert_relative_eq!(stats.potential_energy, -2.0);
    }

    #[test]
    fn test_energy_drift_stays_small() {
        let config = SimulationConfig {
            particle_count: 64,
            softening: 0.1,
            time_step: 0.001,
            seed: Some(11),
            ..Default::default()
        };
        let mut state = ParticleState::random(&config);
        let initial = SystemStatistics::calculate(&state, &config);

        cpu::run(&mut state, &config, 50);
        let after = SystemStatistics::calculate(&state, &config);

        assert!(after.kinetic_energy > 0.0);
        assert!(after.energy_drift(&initial) < 0.01);
    }
}
