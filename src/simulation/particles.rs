//! Initial particle state
//!
//! Positions and velocities are stored as `[f32; 4]` so the same slices can be
//! uploaded unchanged into `array<vec4<f32>>` storage buffers. Positions carry
//! `w = 1`, velocities `w = 0`.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::SimulationConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    pub positions: Vec<[f32; 4]>,
    pub velocities: Vec<[f32; 4]>,
}

impl ParticleState {
    /// Particles scattered uniformly in the spawn cube, all at rest
    pub fn random(config: &SimulationConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let extent = config.spawn_extent.abs();
        let count = config.particle_count as usize;

        let positions = (0..count)
            .map(|_| {
                [
                    rng.random_range(-extent..=extent),
                    rng.random_range(-extent..=extent),
                    rng.random_range(-extent..=extent),
                    1.0,
                ]
            })
            .collect();

        Self {
            positions,
            velocities: vec![[0.0; 4]; count],
        }
    }

    /// State from explicit xyz positions and velocities
    pub fn from_xyz(positions: &[[f32; 3]], velocities: &[[f32; 3]]) -> Self {
        debug_assert_eq!(positions.len(), velocities.len());
        Self {
            positions: positions.iter().map(|&[x, y, z]| [x, y, z, 1.0]).collect(),
            velocities: velocities.iter().map(|&[x, y, z]| [x, y, z, 0.0]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(count: u32, seed: u64) -> SimulationConfig {
        SimulationConfig {
            particle_count: count,
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_random_state_shape() {
        let state = ParticleState::random(&seeded(1000, 7));
        assert_eq!(state.len(), 1000);
        assert_eq!(state.velocities.len(), 1000);

        for p in &state.positions {
            assert_eq!(p[3], 1.0);
            assert!(p[..3].iter().all(|c| (-1.0..=1.0).contains(c)));
        }
        assert!(state.velocities.iter().all(|v| *v == [0.0; 4]));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = ParticleState::random(&seeded(64, 42));
        let b = ParticleState::random(&seeded(64, 42));
        let c = ParticleState::random(&seeded(64, 43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_spawn_extent() {
        let config = SimulationConfig {
            spawn_extent: 0.25,
            ..seeded(256, 1)
        };
        let state = ParticleState::random(&config);
        assert!(state
            .positions
            .iter()
            .all(|p| p[..3].iter().all(|c| c.abs() <= 0.25)));
    }

    #[test]
    fn test_from_xyz_sets_w() {
        let state = ParticleState::from_xyz(&[[1.0, 2.0, 3.0]], &[[4.0, 5.0, 6.0]]);
        assert_eq!(state.positions[0], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(state.velocities[0], [4.0, 5.0, 6.0, 0.0]);
    }
}
