//! Application configuration
//!
//! Every setting has a default. [`AppConfig::from_env`] overrides a subset of
//! them from `GRAVISIM_*` environment variables and validates the result.

use std::str::FromStr;

use thiserror::Error;

/// Largest particle count accepted. Keeps each particle buffer within the
/// downlevel storage binding limit and each dispatch within 65535 workgroups.
pub const MAX_PARTICLES: u32 = 1 << 21;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} could not be parsed")]
    Parse { key: &'static str, value: String },

    #[error("particle count must be at least 1")]
    NoParticles,

    #[error("particle count {0} exceeds the maximum of {max}", max = MAX_PARTICLES)]
    TooManyParticles(u32),

    #[error("gravitational constant {0} must be finite and non-negative")]
    GravitationalConstant(f32),

    #[error("total mass {0} must be finite and positive")]
    TotalMass(f32),

    #[error("spawn extent {0} must be finite and positive")]
    SpawnExtent(f32),

    #[error("time step {0} must be finite and positive")]
    TimeStep(f32),

    #[error("softening {0} must be finite and non-negative")]
    Softening(f32),

    #[error("point size {0} must be finite and non-negative")]
    PointSize(f32),

    #[error("clip planes near={near} far={far} must satisfy 0 < near < far")]
    ClipPlanes { near: f32, far: f32 },

    #[error("vertical field of view {0} must lie strictly between 0 and pi radians")]
    FieldOfView(f32),

    #[error("camera distance {0} must be finite and positive")]
    CameraDistance(f32),

    #[error("colour ramp speed {0} must be finite and positive")]
    MaxSpeed(f32),
}

/// Physics and initial-state parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub particle_count: u32,
    pub gravitational_constant: f32,
    /// Mass shared equally by all particles.
    pub total_mass: f32,
    pub softening: f32,
    pub time_step: f32,
    /// Half-width of the cube particles spawn in.
    pub spawn_extent: f32,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 1024 * 5,
            gravitational_constant: 1.0,
            total_mass: 1.0,
            softening: 0.05,
            time_step: 0.002,
            spawn_extent: 1.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn particle_mass(&self) -> f32 {
        self.total_mass / self.particle_count.max(1) as f32
    }
}

/// Window, camera and particle appearance
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Particle diameter in pixels.
    pub point_size: f32,
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub camera_distance: f32,
    /// Speed at which particles reach the hot end of the colour ramp.
    pub max_speed: f32,
    pub vsync: bool,
    pub show_fps: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            point_size: 2.0,
            fov_y: std::f32::consts::FRAC_PI_3,
            z_near: 0.1,
            z_far: 100.0,
            camera_distance: 5.0,
            max_speed: 1.5,
            vsync: true,
            show_fps: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub render: RenderConfig,
    /// Run this many physics steps without a window instead of opening one.
    pub headless_steps: Option<u32>,
}

impl AppConfig {
    /// Defaults overridden by `GRAVISIM_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let sim = &mut config.simulation;
        let render = &mut config.render;

        override_with(&lookup, "GRAVISIM_PARTICLES", &mut sim.particle_count)?;
        override_with(&lookup, "GRAVISIM_G", &mut sim.gravitational_constant)?;
        override_with(&lookup, "GRAVISIM_SOFTENING", &mut sim.softening)?;
        override_with(&lookup, "GRAVISIM_DT", &mut sim.time_step)?;
        if let Some(seed) = parse_var(&lookup, "GRAVISIM_SEED")? {
            sim.seed = Some(seed);
        }

        override_with(&lookup, "GRAVISIM_POINT_SIZE", &mut render.point_size)?;
        override_with(&lookup, "GRAVISIM_VSYNC", &mut render.vsync)?;
        override_with(&lookup, "GRAVISIM_SHOW_FPS", &mut render.show_fps)?;

        config.headless_steps = parse_var(&lookup, "GRAVISIM_HEADLESS_STEPS")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        let render = &self.render;

        if sim.particle_count == 0 {
            return Err(ConfigError::NoParticles);
        }
        if sim.particle_count > MAX_PARTICLES {
            return Err(ConfigError::TooManyParticles(sim.particle_count));
        }
        if !non_negative(sim.gravitational_constant) {
            return Err(ConfigError::GravitationalConstant(sim.gravitational_constant));
        }
        if !positive(sim.total_mass) {
            return Err(ConfigError::TotalMass(sim.total_mass));
        }
        if !non_negative(sim.softening) {
            return Err(ConfigError::Softening(sim.softening));
        }
        if !positive(sim.time_step) {
            return Err(ConfigError::TimeStep(sim.time_step));
        }
        if !positive(sim.spawn_extent) {
            return Err(ConfigError::SpawnExtent(sim.spawn_extent));
        }

        if !non_negative(render.point_size) {
            return Err(ConfigError::PointSize(render.point_size));
        }
        if !(positive(render.z_near) && render.z_far.is_finite() && render.z_near < render.z_far) {
            return Err(ConfigError::ClipPlanes {
                near: render.z_near,
                far: render.z_far,
            });
        }
        if !(positive(render.fov_y) && render.fov_y < std::f32::consts::PI) {
            return Err(ConfigError::FieldOfView(render.fov_y));
        }
        if !positive(render.camera_distance) {
            return Err(ConfigError::CameraDistance(render.camera_distance));
        }
        if !positive(render.max_speed) {
            return Err(ConfigError::MaxSpeed(render.max_speed));
        }
        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::Parse { key, value }),
    }
}

fn override_with<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = parse_var(lookup, key)? {
        log::debug!("{key} overrides default");
        *target = value;
    }
    Ok(())
}
