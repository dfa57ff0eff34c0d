use std::sync::Arc;

use instant::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::SimConfig;
use crate::error::AppError;
use crate::hud::{Hud, HudFrame};
use crate::population::Population;
use crate::render::instance::{self, AgentInstance};
use crate::render::GpuState;
use crate::util::timer::{SystemPhase, SystemTimers};

/// Target simulation tick rate (seconds per tick).
const TICK_RATE: f64 = 1.0 / 60.0;
/// Max accumulated time before we clamp (prevents spiral of death).
const MAX_ACCUMULATOR: f64 = 0.25;

/// What a key press asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quit,
    TogglePause,
    ToggleDiagnostics,
}

fn command_for(event: &KeyEvent) -> Option<Command> {
    command_for_key(&event.logical_key, event.state, event.repeat)
}

/// Map a window event to a command. Closing the window is a quit.
fn command_for_event(event: &WindowEvent) -> Option<Command> {
    match event {
        WindowEvent::CloseRequested => Some(Command::Quit),
        WindowEvent::KeyboardInput { event, .. } => command_for(event),
        _ => None,
    }
}

/// Drop commands egui consumed, except Quit: a focused widget must not
/// block the stop signal.
fn accepted_command(command: Option<Command>, egui_consumed: bool) -> Option<Command> {
    match command {
        Some(Command::Quit) => Some(Command::Quit),
        _ if egui_consumed => None,
        other => other,
    }
}

fn command_for_key(key: &Key, state: ElementState, repeat: bool) -> Option<Command> {
    if state != ElementState::Pressed || repeat {
        return None;
    }
    match key {
        Key::Named(NamedKey::Escape | NamedKey::ArrowDown) => Some(Command::Quit),
        Key::Named(NamedKey::Space) => Some(Command::TogglePause),
        Key::Named(NamedKey::F12) => Some(Command::ToggleDiagnostics),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Top-level application state.
struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    hud: Option<Hud>,

    population: Population,

    // Fixed timestep
    last_frame_time: Option<Instant>,
    accumulator: f64,
    /// Set once a stop is requested; no tick runs after this.
    stopping: bool,

    /// Startup failure, returned from `run` after the loop exits.
    fatal: Option<AppError>,

    // Render-side phase timers (tick phases live on the population)
    render_timers: SystemTimers,

    // Reusable instance buffer (avoid per-frame allocation)
    instance_buf: Vec<AgentInstance>,
}

impl App {
    fn new(config: SimConfig) -> Self {
        let capacity = instance::capacity_for(config.population);
        Self {
            window: None,
            gpu: None,
            hud: None,
            population: Population::new(config),
            last_frame_time: None,
            accumulator: 0.0,
            stopping: false,
            fatal: None,
            render_timers: SystemTimers::new(),
            instance_buf: Vec::with_capacity(capacity),
        }
    }

    fn paused(&self) -> bool {
        self.hud.as_ref().is_some_and(|h| h.paused)
    }

    /// Run fixed-timestep simulation ticks.
    fn run_fixed_update(&mut self, dt: f64) {
        if self.paused() {
            self.accumulator = 0.0;
            return;
        }

        self.accumulator += dt;
        if self.accumulator > MAX_ACCUMULATOR {
            self.accumulator = MAX_ACCUMULATOR;
        }

        while self.accumulator >= TICK_RATE && !self.stopping {
            let report = self.population.step();
            if let Some(hud) = &mut self.hud {
                hud.curve.record(self.population.tick_count(), report.counts);
            }
            self.accumulator -= TICK_RATE;
        }
    }

    /// Build instance buffer from the population for rendering.
    fn build_instances(&mut self) {
        self.instance_buf.clear();
        let config = self.population.config();
        for agent in self.population.agents() {
            instance::push_agent(
                &mut self.instance_buf,
                agent,
                config.agent_radius,
                config.infection_radius,
            );
        }
    }

    fn stop(&mut self, event_loop: &ActiveEventLoop, reason: &str) {
        log::info!(
            "{reason}, exiting after {} ticks",
            self.population.tick_count()
        );
        self.stopping = true;
        event_loop.exit();
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let config = self.population.config();
        let attrs = WindowAttributes::default()
            .with_title("Social Distancing Simulation")
            .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attrs)?);
        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);

        let gpu = GpuState::new(
            window.clone(),
            config.width,
            config.height,
            instance::capacity_for(config.population),
        )?;
        log::info!("wgpu + agent pipeline initialized");

        let hud = Hud::new(&window, &gpu);

        self.gpu = Some(gpu);
        self.hud = Some(hud);
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self) {
        // --- Timing ---
        let now = Instant::now();
        if let Some(last) = self.last_frame_time {
            let dt = now.duration_since(last).as_secs_f64();
            if let Some(hud) = &mut self.hud {
                hud.record_frame(dt);
            }
            self.run_fixed_update(dt);
        }
        self.last_frame_time = Some(now);

        // --- Build instance buffer ---
        self.render_timers.begin();
        self.build_instances();
        self.render_timers.end(SystemPhase::BuildInstances);

        let (Some(window), Some(gpu), Some(hud)) = (&self.window, &mut self.gpu, &mut self.hud)
        else {
            return;
        };

        // --- Upload ---
        self.render_timers.begin();
        gpu.update_instances(&self.instance_buf);
        self.render_timers.end(SystemPhase::GpuUpload);

        // --- Render ---
        self.render_timers.begin();
        let Some(mut frame) = gpu.begin_frame() else {
            return;
        };
        gpu.draw_agents(&mut frame.encoder, &frame.view);

        // Tick timers from the population, render timers from the app.
        let mut durations = self.population.timers.durations_us;
        for phase in [
            SystemPhase::BuildInstances,
            SystemPhase::GpuUpload,
            SystemPhase::RenderSubmit,
        ] {
            durations[phase as usize] = self.render_timers.durations_us[phase as usize];
        }
        let hud_frame = HudFrame {
            counts: self.population.counts(),
            tick_count: self.population.tick_count(),
            outbreak_over: self.population.outbreak_over(),
            system_durations: &durations,
        };

        let (w, h) = (gpu.surface_config.width, gpu.surface_config.height);
        let (primitives, textures_delta, screen_descriptor) =
            hud.run_frame(window, w, h, &hud_frame);
        let extra_cmd_bufs = hud.prepare_egui(
            &gpu.device,
            &gpu.queue,
            &mut frame.encoder,
            &primitives,
            &textures_delta,
            &screen_descriptor,
        );
        {
            let mut pass = GpuState::begin_egui_pass(&mut frame.encoder, &frame.view);
            hud.render_egui(&mut pass, &primitives, &screen_descriptor);
        }
        gpu.finish_frame(frame.encoder, frame.output, extra_cmd_bufs);
        hud.free_textures(&textures_delta);
        self.render_timers.end(SystemPhase::RenderSubmit);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.init_graphics(event_loop) {
            self.fatal = Some(e);
            self.stopping = true;
            event_loop.exit();
            return;
        }

        let counts = self.population.counts();
        log::info!(
            "Spawned {} agents ({} infected)",
            self.population.agents().len(),
            counts.infected
        );

        // Continuous game loop
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.stopping {
            return;
        }
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let command = command_for_event(&event);
        let consumed = match (&self.window, &mut self.hud) {
            (Some(window), Some(hud)) if command != Some(Command::Quit) => {
                hud.on_window_event(window, &event)
            }
            _ => false,
        };

        match accepted_command(command, consumed) {
            Some(Command::Quit) => {
                let reason = match event {
                    WindowEvent::CloseRequested => "Close requested",
                    _ => "Quit key pressed",
                };
                self.stop(event_loop, reason);
                return;
            }
            Some(Command::TogglePause) => {
                if let Some(hud) = &mut self.hud {
                    hud.toggle_pause();
                }
            }
            Some(Command::ToggleDiagnostics) => {
                if let Some(hud) = &mut self.hud {
                    hud.toggle_diagnostics();
                }
            }
            None => {}
        }
        if consumed {
            return;
        }

        match event {
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if !self.stopping {
                    self.redraw();
                }
            }
            _ => {}
        }
    }
}

/// Entry point — validate config, create event loop and run.
pub fn run(config: SimConfig) -> Result<(), AppError> {
    config.validate()?;
    log::info!(
        "Arena {}x{} | {} agents | max speed {} | separation {} | \
         infection radius {}, chance {}, duration {} ticks",
        config.width,
        config.height,
        config.population,
        config.max_speed,
        config.min_separation,
        config.infection_radius,
        config.infection_chance,
        config.infection_duration,
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
