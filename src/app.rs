//! Windowed application
//!
//! [`run`] opens the window, creates the renderer and the simulation once
//! the event loop resumes, then steps and draws a frame on every redraw.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::AppConfig,
    error::{GravisimError, Result},
    gfx::{
        camera::{CameraController, OrbitCamera},
        particle_renderer::VERTICES_PER_PARTICLE,
        render_engine::RenderEngine,
    },
    performance::PerformanceMonitor,
    simulation::{NBodySimulation, ParticleState},
    ui::UiManager,
};

/// Runs the visualizer until the window closes
pub fn run(config: AppConfig) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app_state = AppState::new(config);
    event_loop.run_app(&mut app_state)?;

    match app_state.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct AppState {
    config: AppConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    simulation: Option<NBodySimulation>,
    ui_manager: Option<UiManager>,
    camera: OrbitCamera,
    controller: CameraController,
    performance: PerformanceMonitor,
    fatal: Option<GravisimError>,
}

impl AppState {
    fn new(config: AppConfig) -> Self {
        let camera = OrbitCamera::from_config(&config.render);

        Self {
            window: None,
            render_engine: None,
            simulation: None,
            ui_manager: None,
            camera,
            controller: CameraController::new(0.005, 0.1),
            performance: PerformanceMonitor::new(),
            fatal: None,
            config,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: GravisimError) {
        log::error!("{err}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let render = &self.config.render;
        let window = Arc::new(
            event_loop.create_window(
                WindowAttributes::default()
                    .with_title("gravisim")
                    .with_inner_size(winit::dpi::LogicalSize::new(render.width, render.height)),
            )?,
        );

        let (width, height) = window.inner_size().into();
        self.camera.resize_projection(width, height);
        log::info!("Window created at {width}x{height}");

        let render_engine = pollster::block_on(RenderEngine::new(
            window.clone(),
            width,
            height,
            &self.camera,
            render,
        ))?;

        let state = ParticleState::random(&self.config.simulation);
        let simulation = NBodySimulation::new(render_engine.device(), &self.config.simulation, &state)?;
        log::info!("Simulating {} particles", simulation.particle_count());

        let ui_manager = UiManager::new(
            render_engine.device(),
            render_engine.queue(),
            render_engine.surface_format(),
            &window,
        );

        self.window = Some(window);
        self.render_engine = Some(render_engine);
        self.simulation = Some(simulation);
        self.ui_manager = Some(ui_manager);
        // Device and pipeline creation do not count toward the first FPS window
        self.performance.reset();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let AppState {
            config,
            window: Some(window),
            render_engine: Some(render_engine),
            simulation: Some(simulation),
            ui_manager,
            camera,
            performance,
            ..
        } = self
        else {
            return;
        };

        performance.begin_frame();
        render_engine.update(camera);

        let window = window.clone();
        let monitor: &PerformanceMonitor = performance;
        let ui_pass = match (ui_manager.as_mut(), config.render.show_fps) {
            (Some(ui_manager), true) => Some(
                move |device: &wgpu::Device,
                      queue: &wgpu::Queue,
                      encoder: &mut wgpu::CommandEncoder,
                      view: &wgpu::TextureView| {
                    ui_manager.draw(device, queue, encoder, &window, view, |ui| {
                        monitor.render_overlay(ui)
                    })
                },
            ),
            _ => None,
        };

        let result = render_engine.render_frame(simulation, ui_pass);
        let vertex_count = simulation.particle_count() * VERTICES_PER_PARTICLE;
        performance.end_frame();
        performance.update_render_stats(vertex_count);

        match result {
            Ok(()) => {}
            Err(GravisimError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                render_engine.reconfigure();
            }
            Err(GravisimError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                self.fail(
                    event_loop,
                    GravisimError::Surface(wgpu::SurfaceError::OutOfMemory),
                );
            }
            Err(GravisimError::Surface(err)) => {
                log::warn!("Skipping frame: {err}");
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if let KeyEvent {
            physical_key: PhysicalKey::Code(KeyCode::Escape),
            state: ElementState::Pressed,
            ..
        } = event
        {
            event_loop.exit();
            return;
        }
        self.controller
            .process_keyed_events(event, &mut self.camera);
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.initialize(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            if ui_manager.handle_input(&window, window_id, &event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.camera.resize_projection(width, height);
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.update_display_size(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                log::info!("Window closed");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self.window.is_none() {
            return;
        }
        if let Some(ui_manager) = self.ui_manager.as_ref() {
            if ui_manager.wants_input() {
                return;
            }
        }
        self.controller.process_events(&event, &mut self.camera);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
