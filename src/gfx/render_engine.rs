//! Window surface and per-frame command recording
//!
//! One frame is a single command buffer: the physics step's compute passes,
//! then the particle pass (black clear, depth `Less`), then the optional UI
//! overlay pass.

use std::sync::Arc;

use super::{
    camera::OrbitCamera,
    context::GpuContext,
    particle_renderer::{ParticleRenderer, ParticleUniforms},
    texture::DepthTexture,
};
use crate::{
    config::RenderConfig,
    error::{GravisimError, Result},
    simulation::NBodySimulation,
};

/// First non-sRGB format, falling back to whatever is listed first
pub fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

/// Fifo with vsync, otherwise Immediate when the surface offers it
pub fn choose_present_mode(vsync: bool, supported: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if !vsync && supported.contains(&wgpu::PresentMode::Immediate) {
        wgpu::PresentMode::Immediate
    } else {
        wgpu::PresentMode::Fifo
    }
}

pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    context: GpuContext,
    config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    particle_renderer: ParticleRenderer,
}

impl RenderEngine {
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        camera: &OrbitCamera,
        render_config: &RenderConfig,
    ) -> Result<RenderEngine> {
        let instance = GpuContext::create_instance();
        let surface = instance.create_surface(window)?;
        let context = GpuContext::request(instance, Some(&surface)).await?;

        let surface_capabilities = surface.get_capabilities(&context.adapter);
        let format = choose_surface_format(&surface_capabilities.formats)
            .ok_or(GravisimError::NoSurfaceFormat)?;
        let present_mode =
            choose_present_mode(render_config.vsync, &surface_capabilities.present_modes);
        log::info!("Surface format {format:?}, present mode {present_mode:?}");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);
        let depth_texture = DepthTexture::new(&context.device, &config, "depth_texture");

        let particle_renderer = ParticleRenderer::new(
            &context.device,
            format,
            ParticleUniforms::new(camera, config.width, config.height, render_config),
            render_config.clone(),
        );

        Ok(RenderEngine {
            surface,
            context,
            config,
            depth_texture,
            particle_renderer,
        })
    }

    /// Steps the simulation and draws the particles, then the overlay
    ///
    /// # Arguments
    /// * `simulation` - Simulation to advance and draw
    /// * `ui_callback` - Optional function that records the UI pass
    pub fn render_frame<F>(
        &mut self,
        simulation: &NBodySimulation,
        ui_callback: Option<F>,
    ) -> Result<()>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView) -> Result<()>,
    {
        let surface_texture = self.surface.get_current_texture()?;
        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        simulation.encode_step(&mut encoder);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.particle_renderer.draw(&mut render_pass, simulation);
        }

        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.context.device,
                &self.context.queue,
                &mut encoder,
                &surface_texture_view,
            )?;
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    pub fn update(&mut self, camera: &OrbitCamera) {
        self.particle_renderer.update(
            &self.context.queue,
            camera,
            self.config.width,
            self.config.height,
        );
    }

    /// Reconfigures the surface and depth buffer; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.context.device, &self.config);
        self.depth_texture = DepthTexture::new(&self.context.device, &self.config, "depth_texture");
    }

    /// Reapplies the current configuration after the surface was lost
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.context.device, &self.config);
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.context.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.context.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{PresentMode, TextureFormat};

    #[test]
    fn test_prefers_non_srgb_format() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));

        let only_srgb = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(choose_surface_format(&only_srgb), Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn test_present_mode() {
        let all = [PresentMode::Fifo, PresentMode::Immediate];
        assert_eq!(choose_present_mode(true, &all), PresentMode::Fifo);
        assert_eq!(choose_present_mode(false, &all), PresentMode::Immediate);
        assert_eq!(choose_present_mode(false, &[PresentMode::Fifo]), PresentMode::Fifo);
    }
}
