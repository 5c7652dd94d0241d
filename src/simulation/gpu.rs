//! GPU n-body compute pipeline
//!
//! Owns the particle buffers. Each [`NBodySimulation::encode_step`] records
//! two dispatches into the caller's encoder: velocities for every particle
//! first, then positions, so no particle moves before all accelerations are
//! known. The position and velocity buffers double as instance vertex
//! buffers for the particle renderer.

use wgpu::{BindGroup, ComputePipeline, Device, Queue};

use super::particles::ParticleState;
use crate::{
    config::SimulationConfig,
    error::{GravisimError, Result},
    wgpu_utils::{
        binding_types, workgroup_count, ArrayBuffer, BindGroupBuilder, BindGroupLayoutBuilder,
        BindGroupLayoutWithDesc, UniformBuffer,
    },
};

pub const WORKGROUP_SIZE: u32 = 64;

const SHADER_SOURCE: &str = include_str!("shaders/nbody.wgsl");

/// Uniforms passed to the compute shader
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PhysicsParams {
    pub gravitational_constant: f32,
    pub particle_mass: f32,
    pub softening_sq: f32,
    pub time_step: f32,
    pub particle_count: u32,
    pub _padding: [u32; 3],
}

impl PhysicsParams {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            gravitational_constant: config.gravitational_constant,
            particle_mass: config.particle_mass(),
            softening_sq: config.softening * config.softening,
            time_step: config.time_step,
            particle_count: config.particle_count,
            _padding: [0; 3],
        }
    }

    /// Params for `particle_count` particles sharing the configured total mass
    pub fn for_particle_count(config: &SimulationConfig, particle_count: u32) -> Self {
        Self::from_config(&SimulationConfig {
            particle_count,
            ..config.clone()
        })
    }
}

/// Most particles whose buffers and dispatches fit within `limits`
pub fn max_particles(limits: &wgpu::Limits) -> u32 {
    let bytes_per_particle = std::mem::size_of::<[f32; 4]>() as u64;
    let by_binding = u64::from(limits.max_storage_buffer_binding_size) / bytes_per_particle;
    let by_buffer = limits.max_buffer_size / bytes_per_particle;
    let by_dispatch = u64::from(limits.max_compute_workgroups_per_dimension) * u64::from(WORKGROUP_SIZE);

    by_binding
        .min(by_buffer)
        .min(by_dispatch)
        .min(u64::from(u32::MAX)) as u32
}

pub struct NBodySimulation {
    positions: ArrayBuffer<[f32; 4]>,
    velocities: ArrayBuffer<[f32; 4]>,
    // Bound in `bind_group`, never rewritten.
    _params: UniformBuffer<PhysicsParams>,
    bind_group: BindGroup,
    velocity_pipeline: ComputePipeline,
    position_pipeline: ComputePipeline,
    dispatch_size: u32,
}

impl NBodySimulation {
    pub fn new(device: &Device, config: &SimulationConfig, state: &ParticleState) -> Result<Self> {
        let count = state.len() as u32;
        let max = max_particles(&device.limits());
        if state.len() > max as usize {
            return Err(GravisimError::TooManyParticles {
                count: state.len(),
                max,
            });
        }
        log::info!("Initializing GPU n-body simulation for {count} particles");

        let particle_usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX;
        let positions =
            ArrayBuffer::new_with_data(device, "Positions", &state.positions, particle_usage);
        let velocities =
            ArrayBuffer::new_with_data(device, "Velocities", &state.velocities, particle_usage);

        let params = UniformBuffer::new_with_data(
            device,
            &PhysicsParams::for_particle_count(config, count),
        );

        let layout = BindGroupLayoutBuilder::new()
            .next_binding_compute(binding_types::storage_buffer_read_write()) // positions
            .next_binding_compute(binding_types::storage_buffer_read_write()) // velocities
            .next_binding_compute(binding_types::uniform()) // params
            .create(device, "N-Body Layout");

        let bind_group = BindGroupBuilder::new(&layout)
            .buffer(positions.buffer())
            .buffer(velocities.buffer())
            .resource(params.binding_resource())
            .create(device, "N-Body Bind Group");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("N-Body Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let velocity_pipeline =
            create_compute_pipeline(device, &shader, "update_velocities", &layout);
        let position_pipeline =
            create_compute_pipeline(device, &shader, "integrate_positions", &layout);

        Ok(Self {
            dispatch_size: workgroup_count(count, WORKGROUP_SIZE),
            positions,
            velocities,
            _params: params,
            bind_group,
            velocity_pipeline,
            position_pipeline,
        })
    }

    /// Records one physics step into `encoder`
    pub fn encode_step(&self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Velocity Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.velocity_pipeline);
            compute_pass.set_bind_group(0, &self.bind_group, &[]);
            compute_pass.dispatch_workgroups(self.dispatch_size, 1, 1);
        }
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Position Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.position_pipeline);
            compute_pass.set_bind_group(0, &self.bind_group, &[]);
            compute_pass.dispatch_workgroups(self.dispatch_size, 1, 1);
        }
    }

    /// Runs `steps` physics steps in a single submission
    pub fn run_steps(&self, device: &Device, queue: &Queue, steps: u32) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("N-Body Encoder"),
        });
        for _ in 0..steps {
            self.encode_step(&mut encoder);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Blocks until the current particle state is copied back from the GPU
    pub fn read_state(&self, device: &Device, queue: &Queue) -> Result<ParticleState> {
        Ok(ParticleState {
            positions: self.positions.read_back(device, queue)?,
            velocities: self.velocities.read_back(device, queue)?,
        })
    }

    pub fn positions(&self) -> &wgpu::Buffer {
        self.positions.buffer()
    }

    pub fn velocities(&self) -> &wgpu::Buffer {
        self.velocities.buffer()
    }

    pub fn particle_count(&self) -> u32 {
        self.positions.len() as u32
    }
}

fn create_compute_pipeline(
    device: &Device,
    shader: &wgpu::ShaderModule,
    entry_point: &str,
    layout: &BindGroupLayoutWithDesc,
) -> ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("N-Body Pipeline Layout"),
        bind_group_layouts: &[&layout.layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(entry_point),
        layout: Some(&pipeline_layout),
        module: shader,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_config() {
        let config = SimulationConfig {
            particle_count: 4,
            total_mass: 2.0,
            softening: 0.1,
            ..Default::default()
        };
        let params = PhysicsParams::from_config(&config);
        assert_eq!(params.particle_mass, 0.5);
        assert_eq!(params.particle_count, 4);
        assert!((params.softening_sq - 0.01).abs() < 1e-7);
        assert_eq!(std::mem::size_of::<PhysicsParams>() % 16, 0);
    }

    #[test]
    fn test_mass_follows_actual_particle_count() {
        let config = SimulationConfig {
            particle_count: 100,
            total_mass: 2.0,
            ..Default::default()
        };
        let params = PhysicsParams::for_particle_count(&config, 4);
        assert_eq!(params.particle_count, 4);
        assert_eq!(params.particle_mass, 0.5);
        assert_eq!(params.gravitational_constant, config.gravitational_constant);
    }

    #[test]
    fn test_max_particles_from_limits() {
        let downlevel = wgpu::Limits::downlevel_defaults();
        assert_eq!(max_particles(&downlevel), 65535 * WORKGROUP_SIZE);
        assert!(max_particles(&downlevel) >= crate::config::MAX_PARTICLES);

        let small_binding = wgpu::Limits {
            max_storage_buffer_binding_size: 16 * 1000,
            ..wgpu::Limits::downlevel_defaults()
        };
        assert_eq!(max_particles(&small_binding), 1000);
    }

    #[test]
    fn test_shader_entry_points() {
        assert!(SHADER_SOURCE.contains("fn update_velocities"));
        assert!(SHADER_SOURCE.contains("fn integrate_positions"));
        assert!(SHADER_SOURCE.contains(&format!("@workgroup_size({WORKGROUP_SIZE}")));
    }
}
