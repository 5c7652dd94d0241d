//! # Frame rate and frame time tracking
//!
//! [`FpsCounter`] produces the once-per-second frames-per-second figure shown
//! in the overlay. [`PerformanceMonitor`] keeps a rolling window of frame
//! times for average, minimum and maximum.
//!
//! ```rust
//! use gravisim::performance::PerformanceMonitor;
//!
//! let mut monitor = PerformanceMonitor::new();
//!
//! // In your main loop
//! monitor.begin_frame();
//! // ... render frame ...
//! monitor.end_frame();
//!
//! let fps = monitor.fps();
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const PUBLISH_INTERVAL: Duration = Duration::from_secs(1);

/// Green on a translucent black backdrop.
const OVERLAY_TEXT_COLOR: [f32; 4] = [0.0, 1.0, 0.0, 1.0];

/// Counts frames and republishes the count once at least a second has passed
#[derive(Debug, Clone)]
pub struct FpsCounter {
    fps: u32,
    frame_count: u32,
    last_publish: Instant,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            fps: 0,
            frame_count: 0,
            last_publish: now,
        }
    }

    /// Last published value; 0 until the first second has elapsed
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frame_completed(&mut self) -> Option<u32> {
        self.frame_completed_at(Instant::now())
    }

    /// Records a finished frame, returning the new value when one is published
    pub fn frame_completed_at(&mut self, now: Instant) -> Option<u32> {
        self.frame_count += 1;
        if now.saturating_duration_since(self.last_publish) < PUBLISH_INTERVAL {
            return None;
        }

        self.fps = self.frame_count;
        self.frame_count = 0;
        self.last_publish = now;
        log::debug!("FPS: {}", self.fps);
        Some(self.fps)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame time statistics over the current window
#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub fps: u32,
    /// Average frame time in milliseconds
    pub frame_time_ms: f32,
    pub min_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
    /// Vertices submitted in the last frame
    pub vertex_count: u32,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            fps: 0,
            frame_time_ms: 0.0,
            min_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            vertex_count: 0,
        }
    }
}

impl PerformanceMetrics {
    pub fn fps_label(&self) -> String {
        format!("FPS: {}", self.fps)
    }
}

pub struct PerformanceMonitor {
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    frame_start: Option<Instant>,
    fps_counter: FpsCounter,
    current_metrics: PerformanceMetrics,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_capacity(120) // ~2 seconds at 60fps
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            frame_start: None,
            fps_counter: FpsCounter::new(),
            current_metrics: PerformanceMetrics::default(),
        }
    }

    pub fn begin_frame(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Closes the frame opened by [`begin_frame`](Self::begin_frame)
    pub fn end_frame(&mut self) {
        if let Some(start) = self.frame_start.take() {
            let now = Instant::now();
            self.record_frame(now.duration_since(start), now);
        }
    }

    /// Adds a frame that finished at `now` after taking `frame_time`
    pub fn record_frame(&mut self, frame_time: Duration, now: Instant) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);

        if let Some(fps) = self.fps_counter.frame_completed_at(now) {
            self.current_metrics.fps = fps;
        }
        self.update_metrics();
    }

    fn update_metrics(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let total_time: Duration = self.frame_times.iter().sum();
        let avg_frame_time = total_time / self.frame_times.len() as u32;
        self.current_metrics.frame_time_ms = avg_frame_time.as_secs_f32() * 1000.0;

        if let (Some(min_time), Some(max_time)) =
            (self.frame_times.iter().min(), self.frame_times.iter().max())
        {
            self.current_metrics.min_frame_time_ms = min_time.as_secs_f32() * 1000.0;
            self.current_metrics.max_frame_time_ms = max_time.as_secs_f32() * 1000.0;
        }
    }

    pub fn update_render_stats(&mut self, vertex_count: u32) {
        self.current_metrics.vertex_count = vertex_count;
    }

    pub fn fps(&self) -> u32 {
        self.current_metrics.fps
    }

    pub fn get_metrics(&self) -> &PerformanceMetrics {
        &self.current_metrics
    }

    pub fn reset(&mut self) {
        self.frame_times.clear();
        self.current_metrics = PerformanceMetrics::default();
        self.frame_start = None;
        self.fps_counter = FpsCounter::new();
    }

    /// Compact FPS badge in the top-right corner
    pub fn render_overlay(&self, ui: &imgui::Ui) {
        let display_size = ui.io().display_size;
        let metrics = self.get_metrics();

        ui.window("FPS")
            .size([120.0, 44.0], imgui::Condition::Always)
            .position([display_size[0] - 130.0, 10.0], imgui::Condition::Always)
            .no_decoration()
            .no_inputs()
            .bg_alpha(0.5)
            .build(|| {
                // imgui's built-in font is monospaced
                ui.text_colored(OVERLAY_TEXT_COLOR, metrics.fps_label());
                ui.text_colored(OVERLAY_TEXT_COLOR, format!("{:.1}ms", metrics.frame_time_ms));
            });
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
