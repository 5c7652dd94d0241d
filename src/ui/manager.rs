//! Overlay UI on top of the particle view
//!
//! [`UiManager`] owns the imgui context together with its winit platform
//! glue and wgpu renderer. The particle pass has already filled the frame by
//! the time the overlay is encoded, so the overlay pass loads the colour
//! target and never touches depth.

use std::time::Instant;

use imgui::{Context, FontConfig, FontSource, MouseCursor};
use imgui_wgpu::{Renderer, RendererConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use wgpu::{CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::{Window, WindowId},
};

use crate::error::{GravisimError, Result};

const OVERLAY_FONT_PIXELS: f32 = 14.0;

/// Window events imgui gets to see. Everything else is left to the app.
pub fn is_ui_input(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseInput { .. }
            | WindowEvent::MouseWheel { .. }
            | WindowEvent::KeyboardInput { .. }
            | WindowEvent::Focused(_)
    )
}

pub struct UiManager {
    imgui: Context,
    platform: WinitPlatform,
    renderer: Renderer,
    frame_started: Instant,
    cursor: Option<MouseCursor>,
}

impl UiManager {
    pub fn new(device: &Device, queue: &Queue, target_format: TextureFormat, window: &Window) -> Self {
        let mut imgui = Context::create();
        imgui.set_ini_filename(None);

        let mut platform = WinitPlatform::new(&mut imgui);
        platform.attach_window(imgui.io_mut(), window, HiDpiMode::Locked(1.0));

        // The default font is monospaced
        imgui.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                size_pixels: OVERLAY_FONT_PIXELS,
                pixel_snap_h: true,
                oversample_h: 1,
                ..FontConfig::default()
            }),
        }]);

        let renderer = Renderer::new(
            &mut imgui,
            device,
            queue,
            RendererConfig {
                texture_format: target_format,
                ..RendererConfig::default()
            },
        );
        log::debug!("Overlay renderer created for {target_format:?}");

        Self {
            imgui,
            platform,
            renderer,
            frame_started: Instant::now(),
            cursor: None,
        }
    }

    pub fn update_display_size(&mut self, width: u32, height: u32) {
        self.imgui.io_mut().display_size = [width as f32, height as f32];
    }

    /// Forwards input to imgui. Returns true when the overlay captured it.
    pub fn handle_input(&mut self, window: &Window, window_id: WindowId, event: &WindowEvent) -> bool {
        if !is_ui_input(event) {
            return false;
        }
        let forwarded: Event<()> = Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        self.platform
            .handle_event(self.imgui.io_mut(), window, &forwarded);
        self.wants_input()
    }

    pub fn wants_input(&self) -> bool {
        let io = self.imgui.io();
        io.want_capture_mouse || io.want_capture_keyboard
    }

    /// Builds the overlay with `build` and encodes it over `target`
    pub fn draw<F>(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        window: &Window,
        target: &TextureView,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&imgui::Ui),
    {
        self.build_frame(window, build)?;
        self.encode_overlay_pass(device, queue, encoder, target)
    }

    fn build_frame<F>(&mut self, window: &Window, build: F) -> Result<()>
    where
        F: FnOnce(&imgui::Ui),
    {
        let now = Instant::now();
        let elapsed = now.duration_since(self.frame_started);
        self.frame_started = now;
        self.imgui.io_mut().update_delta_time(elapsed);

        self.platform.prepare_frame(self.imgui.io_mut(), window)?;

        let ui: &imgui::Ui = self.imgui.frame();
        build(ui);

        let cursor = ui.mouse_cursor();
        if cursor != self.cursor {
            self.cursor = cursor;
            self.platform.prepare_render(ui, window);
        }
        Ok(())
    }

    fn encode_overlay_pass(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        target: &TextureView,
    ) -> Result<()> {
        let draw_data = self.imgui.render();
        let [width, height] = draw_data.display_size;
        if width <= 0.0 || height <= 0.0 {
            return Ok(());
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.renderer
            .render(draw_data, queue, device, &mut pass)
            .map_err(|err| GravisimError::UiRender(format!("{err:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn test_ui_input_filter() {
        assert!(is_ui_input(&WindowEvent::Focused(true)));
        assert!(!is_ui_input(&WindowEvent::Resized(PhysicalSize::new(800, 600))));
        assert!(!is_ui_input(&WindowEvent::CloseRequested));
        assert!(!is_ui_input(&WindowEvent::RedrawRequested));
    }
}
