use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use glam::Vec2;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::monitor::MonitorHandle;
use winit::window::WindowId;

use crate::config::Config;
use crate::engine::frame::Frame;
use crate::engine::Engine;
use crate::geometry::{Rect, ScreenGeometry};
#[cfg(windows)]
use crate::platform;
use crate::physics::TICK_DT;
use crate::signal::SignalListener;

/// Simulation tick (seconds per tick).
const TICK_RATE: f64 = TICK_DT as f64;
/// Max accumulated time before we clamp (prevents spiral of death).
const MAX_ACCUMULATOR: f64 = 0.25;
/// Slow tick for scheduled timers.
const TIMER_RATE: f64 = 0.1;
/// How often to log frame stats (seconds).
const FPS_LOG_INTERVAL: f64 = 5.0;

#[cfg(windows)]
type Backend = platform::win32::Win32Pointer;
#[cfg(not(windows))]
type Backend = crate::pointer::NullPointer;

#[cfg(windows)]
fn new_backend() -> Backend {
    platform::win32::Win32Pointer::new()
}

#[cfg(not(windows))]
fn new_backend() -> Backend {
    crate::pointer::NullPointer
}

/// Physical cursor, sampled once per frame (not per tick).
fn cursor_pos() -> Vec2 {
    #[cfg(windows)]
    let (x, y) = platform::win32::get_mouse_pos();
    #[cfg(not(windows))]
    let (x, y) = (0.0f32, 0.0f32);
    Vec2::new(x, y)
}

/// Operator hotkeys, held state as of this frame.
#[derive(Debug, Clone, Copy, Default)]
struct Hotkeys {
    /// F11: leave Idle and follow the cursor again.
    resume: bool,
    /// F12: same as the remote cancel.
    cancel: bool,
}

fn hotkeys() -> Hotkeys {
    #[cfg(windows)]
    let keys = Hotkeys {
        resume: platform::win32::is_f11_down(),
        cancel: platform::win32::is_f12_down(),
    };
    #[cfg(not(windows))]
    let keys = Hotkeys::default();
    keys
}

/// Turns a polled held state into one event per press.
#[derive(Debug, Default)]
struct KeyEdge {
    was_down: bool,
}

impl KeyEdge {
    fn poll(&mut self, down: bool) -> bool {
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

fn monitor_rect(monitor: &MonitorHandle) -> Rect {
    let pos = monitor.position();
    let size = monitor.size();
    Rect::new(
        pos.x as f32,
        pos.y as f32,
        size.width as f32,
        size.height as f32,
    )
}

/// Primary monitor as the work area, union of all monitors as the desktop.
fn screen_geometry(event_loop: &ActiveEventLoop) -> Option<ScreenGeometry> {
    let primary = event_loop
        .primary_monitor()
        .or_else(|| event_loop.available_monitors().next())?;
    let available = monitor_rect(&primary);
    let virtual_desktop = event_loop
        .available_monitors()
        .map(|m| monitor_rect(&m))
        .fold(available, |acc, r| acc.union(&r));
    Some(ScreenGeometry {
        available,
        virtual_desktop,
    })
}

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

struct FrameStats {
    frame_count: u64,
    last_log_time: Instant,
    frame_time_sum: f64,
    frame_time_max: f64,
    frames_since_log: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frame_count: 0,
            last_log_time: Instant::now(),
            frame_time_sum: 0.0,
            frame_time_max: 0.0,
            frames_since_log: 0,
        }
    }

    fn record_frame(&mut self, dt: f64, frame: &Frame) {
        self.frame_count += 1;
        self.frames_since_log += 1;
        self.frame_time_sum += dt;
        self.frame_time_max = self.frame_time_max.max(dt);

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= FPS_LOG_INTERVAL {
            let avg_ms = (self.frame_time_sum / self.frames_since_log as f64) * 1000.0;
            log::debug!(
                "{} | avg: {:.2}ms | max: {:.2}ms | paws: {} | mask rects: {} | frames: {}",
                frame.mode.label(),
                avg_ms,
                self.frame_time_max * 1000.0,
                frame.marks.len(),
                frame.mask_rects().len(),
                self.frame_count,
            );
            self.last_log_time = Instant::now();
            self.frame_time_sum = 0.0;
            self.frame_time_max = 0.0;
            self.frames_since_log = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Drives the engine from the winit loop. Drawing belongs to the renderer,
/// which consumes `Engine::frame`; this loop owns no window.
struct App {
    engine: Engine<Backend>,
    /// Kept alive for the process lifetime; joins its thread on drop.
    listener: Option<SignalListener>,
    port: u16,

    epoch: Instant,
    last_frame_time: Option<Instant>,
    accumulator: f64,
    next_timer_tick: f64,
    tick_count: u64,

    frame_stats: FrameStats,

    resume_key: KeyEdge,
    cancel_key: KeyEdge,
}

impl App {
    fn new(config: Config) -> Self {
        let port = config.port;
        Self {
            engine: Engine::new(config, ScreenGeometry::default(), new_backend()),
            listener: None,
            port,
            epoch: Instant::now(),
            last_frame_time: None,
            accumulator: 0.0,
            next_timer_tick: 0.0,
            tick_count: 0,
            frame_stats: FrameStats::new(),
            resume_key: KeyEdge::default(),
            cancel_key: KeyEdge::default(),
        }
    }

    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Run fixed-timestep engine steps, then the slow timer tick.
    fn run_fixed_update(&mut self, dt: f64) {
        self.accumulator += dt;

        if self.accumulator > MAX_ACCUMULATOR {
            self.accumulator = MAX_ACCUMULATOR;
        }

        let cursor = cursor_pos();
        let mut sim_time = self.now() - self.accumulator;

        while self.accumulator >= TICK_RATE {
            sim_time += TICK_RATE;
            self.engine.step(sim_time, cursor);
            self.accumulator -= TICK_RATE;
            self.tick_count += 1;
        }

        let now = self.now();
        if now >= self.next_timer_tick {
            self.engine.tick_timers(now);
            self.next_timer_tick = now + TIMER_RATE;
        }
    }

    fn poll_hotkeys(&mut self) {
        let keys = hotkeys();
        if self.resume_key.poll(keys.resume) {
            log::info!("F11 pressed, resuming follow");
            self.engine.resume_following();
        }
        if self.cancel_key.poll(keys.cancel) {
            log::info!("F12 pressed, de-escalating");
            self.engine.request_deescalate();
        }
    }

    fn shutdown(&mut self) {
        self.engine.shutdown();
        self.listener = None;
        log::info!("Shut down after {} ticks", self.tick_count);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        match screen_geometry(event_loop) {
            Some(screen) => self.engine.set_screen(screen),
            None => log::warn!("No monitor found, using default screen geometry"),
        }

        if self.listener.is_none() {
            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));
            match SignalListener::spawn(addr, self.engine.command_sender()) {
                Ok(listener) => {
                    log::info!("Cancel command accepted on udp://{}", listener.local_addr());
                    self.listener = Some(listener);
                }
                Err(e) => log::warn!("Signal listener unavailable on port {}: {e}", self.port),
            }
        }

        let now = self.now();
        self.engine.start(now);
        event_loop.set_control_flow(ControlFlow::WaitUntil(
            Instant::now() + Duration::from_secs_f64(TICK_RATE),
        ));
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // No focused window, so ESC is polled globally.
        #[cfg(windows)]
        if platform::win32::is_escape_pressed() {
            log::info!("ESC pressed, exiting");
            self.shutdown();
            event_loop.exit();
            return;
        }

        self.poll_hotkeys();

        let now = Instant::now();
        if let Some(last) = self.last_frame_time {
            let dt = now.duration_since(last).as_secs_f64();
            self.run_fixed_update(dt);
            let frame = self.engine.frame(self.now());
            self.frame_stats.record_frame(dt, &frame);
        }
        self.last_frame_time = Some(now);

        event_loop.set_control_flow(ControlFlow::WaitUntil(
            now + Duration::from_secs_f64(TICK_RATE),
        ));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, exiting");
            self.shutdown();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.engine.shutdown();
    }
}

/// Entry point: read config, create the event loop and run.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    log::info!("Config: {config:?}");

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
