use winit::window::Window;

use crate::agent::{HealthCounts, HealthState};
use crate::render::GpuState;
use crate::util::ring::RingBuffer;
use crate::util::timer::{SystemPhase, PHASE_COUNT};

/// Number of frame times to keep in the histogram.
const FRAME_HISTORY_LEN: usize = 300;
/// Number of census samples kept for the epidemic curve.
const CURVE_HISTORY_LEN: usize = 600;
/// Ticks between census samples on the curve.
const CURVE_SAMPLE_INTERVAL: u64 = 5;
/// Seconds between FPS log lines.
const FPS_LOG_INTERVAL: f64 = 5.0;

const HEALTHY_RGB: egui::Color32 = egui::Color32::from_rgb(0, 0, 255);
const INFECTED_RGB: egui::Color32 = egui::Color32::from_rgb(255, 0, 0);
const IMMUNE_RGB: egui::Color32 = egui::Color32::from_rgb(0, 200, 0);

/// Census history sampled every `interval` ticks.
pub struct EpidemicCurve {
    pub samples: RingBuffer<HealthCounts>,
    interval: u64,
    last_tick: Option<u64>,
}

impl EpidemicCurve {
    pub fn new(capacity: usize, interval: u64) -> Self {
        Self {
            samples: RingBuffer::new(capacity),
            interval,
            last_tick: None,
        }
    }

    pub fn record(&mut self, tick: u64, counts: HealthCounts) {
        let due = match self.last_tick {
            None => true,
            Some(last) => tick >= last + self.interval,
        };
        if due {
            self.samples.push(counts);
            self.last_tick = Some(tick);
        }
    }
}

/// Per-frame data the HUD reads from the simulation.
pub struct HudFrame<'a> {
    pub counts: HealthCounts,
    pub tick_count: u64,
    pub outbreak_over: bool,
    pub system_durations: &'a [f64; PHASE_COUNT],
}

/// Counters overlay plus an F12 diagnostics window, powered by egui.
pub struct Hud {
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,

    /// Diagnostics window visibility (counters are always shown).
    pub diagnostics_visible: bool,
    /// Pause control, read back by the app each frame.
    pub paused: bool,

    /// Rolling window of frame times (seconds).
    pub frame_times: RingBuffer<f64>,
    /// Census history for the epidemic curve.
    pub curve: EpidemicCurve,

    /// Computed stats.
    pub fps: f64,
    pub frame_time_avg: f64,
    pub frame_time_min: f64,
    pub frame_time_max: f64,

    // Periodic FPS log accumulator.
    frame_count: u64,
    log_timer: f64,
    log_frame_count: u32,
    log_frame_sum: f64,
    log_frame_min: f64,
    log_frame_max: f64,
}

impl Hud {
    pub fn new(window: &Window, gpu: &GpuState) -> Self {
        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::light());

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(gpu.device.limits().max_texture_dimension_2d as usize),
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: None,
                msaa_samples: 1,
                dithering: true,
                predictable_texture_filtering: false,
            },
        );

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
            diagnostics_visible: false,
            paused: false,
            frame_times: RingBuffer::new(FRAME_HISTORY_LEN),
            curve: EpidemicCurve::new(CURVE_HISTORY_LEN, CURVE_SAMPLE_INTERVAL),
            fps: 0.0,
            frame_time_avg: 0.0,
            frame_time_min: 0.0,
            frame_time_max: 0.0,
            frame_count: 0,
            log_timer: 0.0,
            log_frame_count: 0,
            log_frame_sum: 0.0,
            log_frame_min: f64::MAX,
            log_frame_max: 0.0,
        }
    }

    /// Record a frame time, update rolling stats, and periodically log.
    pub fn record_frame(&mut self, dt: f64) {
        self.frame_count += 1;
        self.frame_times.push(dt);

        if !self.frame_times.is_empty() {
            let len = self.frame_times.len();
            let mut sum = 0.0;
            let mut min = f64::MAX;
            let mut max = 0.0f64;
            for &t in self.frame_times.iter() {
                sum += t;
                min = min.min(t);
                max = max.max(t);
            }
            self.frame_time_avg = sum / len as f64;
            self.frame_time_min = min;
            self.frame_time_max = max;
            self.fps = if self.frame_time_avg > 0.0 {
                1.0 / self.frame_time_avg
            } else {
                0.0
            };
        }

        self.log_frame_count += 1;
        self.log_frame_sum += dt;
        self.log_frame_min = self.log_frame_min.min(dt);
        self.log_frame_max = self.log_frame_max.max(dt);
        self.log_timer += dt;

        if self.log_timer >= FPS_LOG_INTERVAL {
            let avg_ms = (self.log_frame_sum / self.log_frame_count as f64) * 1000.0;
            let fps = self.log_frame_count as f64 / self.log_timer;
            log::info!(
                "FPS: {:.0} | avg: {:.2}ms | min: {:.2}ms | max: {:.2}ms | total frames: {}",
                fps,
                avg_ms,
                self.log_frame_min * 1000.0,
                self.log_frame_max * 1000.0,
                self.frame_count,
            );
            self.log_timer = 0.0;
            self.log_frame_count = 0;
            self.log_frame_sum = 0.0;
            self.log_frame_min = f64::MAX;
            self.log_frame_max = 0.0;
        }
    }

    pub fn toggle_diagnostics(&mut self) {
        self.diagnostics_visible = !self.diagnostics_visible;
        log::debug!("Diagnostics {}", if self.diagnostics_visible { "shown" } else { "hidden" });
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!("Simulation {}", if self.paused { "paused" } else { "resumed" });
    }

    /// Forward a winit event to egui. Returns true if egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        response.consumed
    }

    /// Run the egui frame and produce paint output.
    /// Returns (clipped_primitives, textures_delta, screen_descriptor).
    pub fn run_frame(
        &mut self,
        window: &Window,
        screen_w: u32,
        screen_h: u32,
        frame: &HudFrame<'_>,
    ) -> (
        Vec<egui::epaint::ClippedPrimitive>,
        egui::TexturesDelta,
        egui_wgpu::ScreenDescriptor,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        // Snapshot read-only state for UI drawing (avoids borrow conflict
        // between egui_ctx.run() borrowing self and the closure borrowing self).
        let ui_state = UiSnapshot {
            diagnostics_visible: self.diagnostics_visible,
            counts: frame.counts,
            tick_count: frame.tick_count,
            population: frame.counts.total(),
            outbreak_over: frame.outbreak_over,
            fps: self.fps,
            last_frame_time: self.frame_times.latest().unwrap_or(0.0),
            frame_time_avg: self.frame_time_avg,
            frame_time_min: self.frame_time_min,
            frame_time_max: self.frame_time_max,
            frame_times: self.frame_times.iter().copied().collect(),
            system_durations: *frame.system_durations,
            curve: self.curve.samples.iter().copied().collect(),
        };

        let mut paused = self.paused;

        let ctx = self.egui_ctx.clone();
        let full_output = ctx.run(raw_input, |ctx| {
            draw_counters(ctx, &ui_state);
            draw_diagnostics(ctx, &ui_state, &mut paused);
        });

        if paused != self.paused {
            self.toggle_pause();
        }

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = full_output.pixels_per_point;
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes, pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [screen_w, screen_h],
            pixels_per_point,
        };

        (clipped_primitives, full_output.textures_delta, screen_descriptor)
    }

    /// Upload egui textures and buffers. Call before the egui render pass.
    pub fn prepare_egui(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::epaint::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor)
    }

    /// Render egui into the given render pass.
    pub fn render_egui(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::epaint::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures after present.
    pub fn free_textures(&mut self, textures_delta: &egui::TexturesDelta) {
        for &id in &textures_delta.free {
            self.egui_renderer.free_texture(&id);
        }
    }
}

// ---------------------------------------------------------------------------
// UI snapshot + free-function draw (avoids borrow conflicts with egui_ctx)
// ---------------------------------------------------------------------------

struct UiSnapshot {
    diagnostics_visible: bool,
    counts: HealthCounts,
    tick_count: u64,
    population: usize,
    outbreak_over: bool,
    fps: f64,
    last_frame_time: f64,
    frame_time_avg: f64,
    frame_time_min: f64,
    frame_time_max: f64,
    frame_times: Vec<f64>,
    system_durations: [f64; PHASE_COUNT],
    curve: Vec<HealthCounts>,
}

fn state_color(state: HealthState) -> egui::Color32 {
    match state {
        HealthState::Healthy => HEALTHY_RGB,
        HealthState::Infected => INFECTED_RGB,
        HealthState::Immune => IMMUNE_RGB,
    }
}

/// Healthy / Infected / Immune counters pinned to the top-left corner.
fn draw_counters(ctx: &egui::Context, s: &UiSnapshot) {
    egui::Area::new(egui::Id::new("counters"))
        .fixed_pos(egui::pos2(10.0, 10.0))
        .interactable(false)
        .show(ctx, |ui| {
            for state in HealthState::ALL {
                ui.label(
                    egui::RichText::new(format!("{}: {}", state.label(), s.counts.get(state)))
                        .size(20.0)
                        .color(egui::Color32::BLACK),
                );
            }
        });
}

fn draw_diagnostics(ctx: &egui::Context, s: &UiSnapshot, paused: &mut bool) {
    if !s.diagnostics_visible {
        return;
    }

    let panel_frame = egui::Frame::NONE
        .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, 220))
        .corner_radius(6.0)
        .inner_margin(10.0);

    egui::Window::new("Diagnostics")
        .default_pos([480.0, 10.0])
        .default_width(300.0)
        .resizable(true)
        .frame(panel_frame)
        .show(ctx, |ui| {
            ui.style_mut().visuals.override_text_color = Some(egui::Color32::from_gray(220));

            // --- Performance ---
            ui.heading("Performance");
            ui.label(format!("FPS: {:.1}", s.fps));
            ui.label(format!(
                "Frame: {:.2}ms last | {:.2} avg | {:.2} min | {:.2} max",
                s.last_frame_time * 1000.0,
                s.frame_time_avg * 1000.0,
                s.frame_time_min * 1000.0,
                s.frame_time_max * 1000.0,
            ));
            draw_frame_histogram(ui, &s.frame_times);
            ui.add_space(4.0);

            // --- Tick phases ---
            ui.heading("System Timers");
            let total: f64 = s.system_durations.iter().sum::<f64>().max(1.0);
            let max_us = s
                .system_durations
                .iter()
                .copied()
                .fold(0.0f64, f64::max)
                .max(1.0);

            for phase in SystemPhase::ALL {
                let us = s.system_durations[phase as usize];
                let pct = us / total * 100.0;
                let bar_frac = (us / max_us) as f32;

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(format!("{:<12}", phase.label())).monospace());
                    ui.label(
                        egui::RichText::new(format!("{:>5.0}us ({:>2.0}%)", us, pct)).monospace(),
                    );

                    let (response, painter) =
                        ui.allocate_painter(egui::vec2(80.0, 12.0), egui::Sense::hover());
                    let r = response.rect;
                    painter.rect_filled(
                        egui::Rect::from_min_max(
                            r.left_top(),
                            egui::pos2(r.left() + r.width() * bar_frac, r.bottom()),
                        ),
                        2.0,
                        egui::Color32::from_rgb(100, 180, 255),
                    );
                });
            }
            ui.add_space(4.0);

            // --- Epidemic curve ---
            ui.heading("Epidemic Curve");
            draw_curve(ui, &s.curve, s.population);
            ui.add_space(4.0);

            // --- Controls ---
            ui.heading("Controls");
            ui.checkbox(paused, "Pause Simulation");
            ui.label(format!("Ticks: {} | Agents: {}", s.tick_count, s.population));
            if s.outbreak_over {
                ui.label("Outbreak over");
            }
            ui.label("F12: Toggle | Space: Pause | ESC/Down: Quit");
        });
}

fn draw_frame_histogram(ui: &mut egui::Ui, frame_times: &[f64]) {
    if frame_times.is_empty() {
        return;
    }
    let max_time = frame_times.iter().copied().fold(0.0f64, f64::max).max(0.020);

    let (response, painter) = ui.allocate_painter(egui::vec2(280.0, 50.0), egui::Sense::hover());
    let rect = response.rect;

    let bar_width = rect.width() / frame_times.len() as f32;
    let target_y = rect.bottom() - (0.01667 / max_time as f32) * rect.height();

    for (i, &t) in frame_times.iter().enumerate() {
        let h = (t / max_time) as f32 * rect.height();
        let x = rect.left() + i as f32 * bar_width;
        let color = if t > 0.01667 {
            egui::Color32::from_rgb(255, 100, 80)
        } else {
            egui::Color32::from_rgb(80, 200, 120)
        };
        painter.rect_filled(
            egui::Rect::from_min_max(
                egui::pos2(x, rect.bottom() - h),
                egui::pos2(x + bar_width, rect.bottom()),
            ),
            0.0,
            color,
        );
    }

    // 16.67ms target line
    painter.line_segment(
        [
            egui::pos2(rect.left(), target_y),
            egui::pos2(rect.right(), target_y),
        ],
        egui::Stroke::new(1.0, egui::Color32::from_rgb(255, 255, 100)),
    );
}

/// One polyline per health state, scaled to the population size.
fn draw_curve(ui: &mut egui::Ui, curve: &[HealthCounts], population: usize) {
    let (response, painter) = ui.allocate_painter(egui::vec2(280.0, 80.0), egui::Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(245));

    if curve.len() < 2 || population == 0 {
        return;
    }

    let step = rect.width() / (curve.len() - 1) as f32;
    for state in HealthState::ALL {
        let points: Vec<egui::Pos2> = curve
            .iter()
            .enumerate()
            .map(|(i, counts)| {
                let frac = counts.get(state) as f32 / population as f32;
                egui::pos2(rect.left() + i as f32 * step, rect.bottom() - frac * rect.height())
            })
            .collect();
        painter.add(egui::Shape::line(
            points,
            egui::Stroke::new(1.5, state_color(state)),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(infected: usize) -> HealthCounts {
        HealthCounts {
            healthy: 10 - infected,
            infected,
            immune: 0,
        }
    }

    #[test]
    fn curve_samples_at_fixed_spacing() {
        let mut curve = EpidemicCurve::new(16, 5);
        for tick in 1..=12 {
            curve.record(tick, counts(tick as usize % 10));
        }
        // ticks 1, 6, 11
        let infected: Vec<usize> = curve.samples.iter().map(|c| c.infected).collect();
        assert_eq!(infected, vec![1, 6, 1]);
    }

    #[test]
    fn curve_keeps_only_recent_history() {
        let mut curve = EpidemicCurve::new(3, 1);
        for tick in 0..10 {
            curve.record(tick, counts(tick as usize));
        }
        assert_eq!(curve.samples.len(), 3);
        assert_eq!(curve.samples.latest(), Some(counts(9)));
    }
}
