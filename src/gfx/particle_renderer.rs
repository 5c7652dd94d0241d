//! Particle render pipeline
//!
//! Draws the simulation's position and velocity buffers directly as instance
//! vertex buffers. The vertex stage writes one [`VertexOut`] per quad corner
//! and the fragment stage returns its interpolated colour.

use bytemuck::{Pod, Zeroable};
use cgmath::{InnerSpace, Vector3, Vector4};

use super::{camera::OrbitCamera, texture::DepthTexture, vertex_out::VertexOut};
use crate::{
    config::RenderConfig,
    simulation::NBodySimulation,
    wgpu_utils::{binding_types, BindGroupBuilder, BindGroupLayoutBuilder, UniformBuffer},
};

const SHADER_BODY: &str = include_str!("shaders/particles.wgsl");

/// Vertices per particle quad (two triangles)
pub const VERTICES_PER_PARTICLE: u32 = 6;

const QUAD_CORNERS: [[f32; 2]; 6] = [
    [-0.5, -0.5],
    [0.5, -0.5],
    [0.5, 0.5],
    [-0.5, -0.5],
    [0.5, 0.5],
    [-0.5, 0.5],
];

pub const COOL_COLOR: [f32; 4] = [0.15, 0.35, 1.0, 1.0];
pub const HOT_COLOR: [f32; 4] = [1.0, 0.55, 0.1, 1.0];

/// Full WGSL source: the [`VertexOut`] declaration followed by the stages
pub fn shader_source() -> String {
    format!("{}{}", VertexOut::WGSL, SHADER_BODY)
}

/// Colour ramp from [`COOL_COLOR`] at rest to [`HOT_COLOR`] at `max_speed`
pub fn speed_color(speed: f32, max_speed: f32) -> [f32; 4] {
    let t = (speed / max_speed.max(1e-6)).clamp(0.0, 1.0);
    std::array::from_fn(|i| COOL_COLOR[i] * (1.0 - t) + HOT_COLOR[i] * t)
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ParticleUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Surface size in pixels.
    pub viewport: [f32; 2],
    pub point_size: f32,
    pub max_speed: f32,
}

impl ParticleUniforms {
    pub fn new(camera: &OrbitCamera, width: u32, height: u32, config: &RenderConfig) -> Self {
        Self {
            view_proj: camera.build_view_projection_matrix().into(),
            viewport: [width.max(1) as f32, height.max(1) as f32],
            point_size: config.point_size,
            max_speed: config.max_speed,
        }
    }

    /// Host-side mirror of `vertex_main`
    pub fn vertex_out(&self, position: [f32; 4], velocity: [f32; 4], vertex_index: u32) -> VertexOut {
        let view_proj = cgmath::Matrix4::from(self.view_proj);
        let center = view_proj * Vector4::new(position[0], position[1], position[2], 1.0);
        let [cx, cy] = QUAD_CORNERS[vertex_index as usize % QUAD_CORNERS.len()];
        let scale = self.point_size * 2.0 * center.w;

        let clip = [
            center.x + cx * scale / self.viewport[0],
            center.y + cy * scale / self.viewport[1],
            center.z,
            center.w,
        ];
        let speed = Vector3::new(velocity[0], velocity[1], velocity[2]).magnitude();

        VertexOut::new(clip, self.point_size, speed_color(speed, self.max_speed))
    }
}

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];
const VELOCITY_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x4];

/// One `vec4<f32>` per instance
fn instance_layout(attributes: &'static [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes,
    }
}

pub struct ParticleRenderer {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBuffer<ParticleUniforms>,
    bind_group: wgpu::BindGroup,
    config: RenderConfig,
}

impl ParticleRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        initial: ParticleUniforms,
        config: RenderConfig,
    ) -> Self {
        let uniforms = UniformBuffer::new_with_data(device, &initial);

        let layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(device, "Particle Layout");
        let bind_group = BindGroupBuilder::new(&layout)
            .resource(uniforms.binding_resource())
            .create(device, "Particle Bind Group");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&layout.layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vertex_main"),
                buffers: &[
                    instance_layout(&POSITION_ATTRIBUTES),
                    instance_layout(&VELOCITY_ATTRIBUTES),
                ],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fragment_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniforms,
            bind_group,
            config,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, camera: &OrbitCamera, width: u32, height: u32) {
        let uniforms = ParticleUniforms::new(camera, width, height, &self.config);
        self.uniforms.update_content(queue, uniforms);
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, simulation: &NBodySimulation) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, simulation.positions().slice(..));
        render_pass.set_vertex_buffer(1, simulation.velocities().slice(..));
        render_pass.draw(0..VERTICES_PER_PARTICLE, 0..simulation.particle_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniforms(point_size: f32) -> ParticleUniforms {
        let camera = OrbitCamera::new(5.0, std::f32::consts::FRAC_PI_3, 0.1, 100.0, 1.5);
        let config = RenderConfig {
            point_size,
            ..Default::default()
        };
        ParticleUniforms::new(&camera, 1200, 800, &config)
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 80);
    }

    #[test]
    fn test_shader_uses_vertex_out_declaration() {
        let source = shader_source();
        assert!(source.starts_with(VertexOut::WGSL));
        assert!(source.contains("fn vertex_main"));
        assert!(source.contains("-> VertexOut"));
        assert!(source.contains("fn fragment_main(in: VertexOut)"));
    }

    #[test]
    fn test_quad_spans_point_size_pixels() {
        let u = uniforms(4.0);
        let origin = [0.0, 0.0, 0.0, 1.0];
        let rest = [0.0; 4];

        let low = u.vertex_out(origin, rest, 0).ndc().unwrap();
        let high = u.vertex_out(origin, rest, 2).ndc().unwrap();

        let width_px = (high[0] - low[0]) * 0.5 * 1200.0;
        let height_px = (high[1] - low[1]) * 0.5 * 800.0;
        assert_relative_eq!(width_px, 4.0, epsilon = 1e-3);
        assert_relative_eq!(height_px, 4.0, epsilon = 1e-3);
        assert_relative_eq!(low[2], high[2]);
    }

    #[test]
    fn test_vertex_out_is_valid() {
        let u = uniforms(2.0);
        for i in 0..VERTICES_PER_PARTICLE {
            let v = u.vertex_out([0.5, -0.3, 0.8, 1.0], [0.2, 0.0, 0.0, 0.0], i);
            assert!(v.validate().is_ok());
            assert_eq!(v.point_size, 2.0);
            assert!(v.position[3] > 0.0);
        }
    }

    #[test]
    fn test_vertex_depth_and_w_from_camera_distance() {
        let u = uniforms(2.0);
        let v = u.vertex_out([0.0, 0.0, 0.0, 1.0], [0.0; 4], 0);
        assert_relative_eq!(v.position[3], 5.0, epsilon = 1e-4);

        let [_, _, depth] = v.ndc().unwrap();
        assert!(depth > 0.0 && depth < 1.0);

        let near = u.vertex_out([0.0, 0.0, 4.9, 1.0], [0.0; 4], 0);
        assert_relative_eq!(near.ndc().unwrap()[2], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_speed_color_ramp() {
        assert_eq!(speed_color(0.0, 1.5), COOL_COLOR);
        assert_eq!(speed_color(1.5, 1.5), HOT_COLOR);
        assert_eq!(speed_color(100.0, 1.5), HOT_COLOR);

        let mid = speed_color(0.75, 1.5);
        assert_relative_eq!(mid[0], (COOL_COLOR[0] + HOT_COLOR[0]) * 0.5);
        assert_eq!(mid[3], 1.0);
    }
}
