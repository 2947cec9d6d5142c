pub mod frame;
pub mod mode;

use std::sync::mpsc::{self, Receiver, Sender};

use glam::Vec2;

use crate::config::Config;
use crate::geometry::{Edge, LinearPath, Rect, ScreenGeometry};
use crate::physics::{self, Body, ClampPolicy, MotionSample, Tuning};
use crate::pointer::{CursorArbiter, Drive, PointerBackend};
use crate::schedule::{EscalationFactor, ScheduleController, TimerKind, Timers};
use crate::signal::Command;
use crate::trail::PawTrail;

use self::frame::{Bubble, Frame, MarkView};
use self::mode::{Mode, ModeKind, ScriptedRun, Takeover};

/// How long one takeover lasts (seconds, uniform).
const TAKEOVER_DURATION: (f64, f64) = (10.0, 15.0);
/// Retreat time after a cancel (seconds).
const EXIT_DURATION: f64 = 1.5;
/// How far beyond the desktop edge the sprite retreats to.
const EXIT_MARGIN: f32 = 200.0;
/// Duration of one scripted dash (seconds).
const RUN_DURATION: f64 = 5.0;
/// Off-screen pause after a dash before the next can be triggered.
const RUN_HOLD: f64 = 0.5;
/// Divides the dash's px/s speed before it drives the paw cadence.
/// Tunable, not derived from anything.
const RUN_SPEED_SCALE: f32 = 50.0;
/// How long a speech bubble stays up (seconds).
const DIALOG_VISIBLE: f64 = 3.0;
/// Retry delay when a rampage comes due mid-run.
const RAMPAGE_RETRY: f64 = 1.0;

const DIALOG_LINES: &[&str] = &[
    "Where are my gifts?",
    "I know you have them.",
    "Give. Me. The. Gifts.",
    "Your cursor is mine now!",
    "Nobody leaves until the gifts are found!",
    "Check under the tree. Again.",
    "I can do this all day.",
];

/// The mode state machine and sole owner of sprite state.
///
/// Two entry points advance it: `step` (fast tick, ~60 Hz) and
/// `tick_timers` (slow tick). Both take `&mut self`, so every write to the
/// body, trail, factors and mode is serialized through whoever owns the
/// engine. Outside threads only reach it through `command_sender`.
pub struct Engine<B: PointerBackend> {
    mode: Mode,
    body: Body,
    tuning: Tuning,
    trail: PawTrail,
    arbiter: CursorArbiter<B>,
    schedule: ScheduleController,
    timers: Timers,
    rng: fastrand::Rng,
    screen: ScreenGeometry,
    config: Config,
    /// Physical cursor as of the last step.
    cursor: Vec2,
    /// Text of the visible speech bubble.
    dialog: Option<&'static str>,
    /// Cleared when a rampage is pending so no new run starts.
    can_trigger_run: bool,
    started: bool,
    inbox: Receiver<Command>,
    inbox_tx: Sender<Command>,
}

impl<B: PointerBackend> Engine<B> {
    pub fn new(config: Config, screen: ScreenGeometry, backend: B) -> Self {
        let mut rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let park = screen.offscreen_point(Edge::Left, EXIT_MARGIN, &mut rng);
        let (inbox_tx, inbox) = mpsc::channel();

        Self {
            mode: Mode::Idle,
            body: Body::at(park),
            tuning: Tuning::default(),
            trail: PawTrail::new(),
            arbiter: CursorArbiter::new(backend),
            schedule: ScheduleController::new(),
            timers: Timers::new(),
            rng,
            screen,
            config,
            cursor: Vec2::ZERO,
            dialog: None,
            can_trigger_run: false,
            started: false,
            inbox,
            inbox_tx,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[cfg(test)]
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    #[cfg(test)]
    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    #[cfg(test)]
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    #[cfg(test)]
    pub fn velocity(&self) -> Vec2 {
        self.body.velocity
    }

    #[cfg(test)]
    pub fn factor(&self) -> EscalationFactor {
        self.schedule.factor()
    }

    #[cfg(test)]
    pub fn arbiter(&self) -> &CursorArbiter<B> {
        &self.arbiter
    }

    #[cfg(test)]
    pub fn arbiter_mut(&mut self) -> &mut CursorArbiter<B> {
        &mut self.arbiter
    }

    #[cfg(test)]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    #[cfg(test)]
    pub fn dialog(&self) -> Option<&'static str> {
        self.dialog
    }

    #[cfg(test)]
    pub fn trail(&self) -> &PawTrail {
        &self.trail
    }

    /// Channel for other threads. Commands are applied at the next `step`.
    pub fn command_sender(&self) -> Sender<Command> {
        self.inbox_tx.clone()
    }

    pub fn set_screen(&mut self, screen: ScreenGeometry) {
        if self.screen != screen {
            log::info!(
                "Screen geometry changed: available {:?}, desktop {:?}",
                screen.available,
                screen.virtual_desktop
            );
            self.screen = screen;
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Begin following the cursor and arm the first rampage.
    pub fn start(&mut self, now: f64) {
        if self.started {
            return;
        }
        self.started = true;
        self.enter(Mode::Following);
        self.arm_rampage(now);
    }

    /// Queue a de-escalation; applied at the top of the next `step`.
    pub fn request_deescalate(&self) {
        let _ = self.inbox_tx.send(Command::Deescalate);
    }

    /// Leave `Idle` for calm following. Ignored in any other mode.
    pub fn resume_following(&mut self) {
        if self.mode != Mode::Idle {
            log::debug!("resume_following ignored in {}", self.mode.kind().label());
            return;
        }
        self.can_trigger_run = false;
        self.timers.disarm(TimerKind::ScriptedRun);
        self.enter(Mode::Following);
    }

    /// Start the rampage now (timer fired, or an external trigger).
    pub fn activate_rampage(&mut self, now: f64) {
        match self.mode {
            Mode::Idle | Mode::Following => {}
            Mode::ScriptedRun(_) => {
                log::debug!("Rampage due mid-run, retrying in {RAMPAGE_RETRY}s");
                self.timers.arm(TimerKind::RampageArm, now + RAMPAGE_RETRY);
                return;
            }
            _ => {
                log::debug!("Rampage activation ignored in {}", self.mode.kind().label());
                return;
            }
        }

        if self.mode == Mode::Idle {
            // Charge in from just off-screen rather than from wherever the
            // last exit left us.
            let entry = self.screen.random_offscreen_point(EXIT_MARGIN, &mut self.rng);
            self.body.place(entry);
        }

        self.can_trigger_run = false;
        self.timers.disarm(TimerKind::ScriptedRun);
        self.timers.disarm(TimerKind::RampageArm);

        let takeover_in = self.schedule.next_takeover_delay(false, &mut self.rng);
        let dialog_in = self.schedule.next_dialog_delay(false, &mut self.rng);
        self.timers.arm(TimerKind::TakeoverStart, now + takeover_in);
        self.timers.arm(TimerKind::DialogShow, now + dialog_in);

        self.enter(Mode::Rampage);
        log::info!("Rampage! first takeover in {takeover_in:.1}s");
    }

    /// Release the pointer unconditionally. Call before the process exits.
    pub fn shutdown(&mut self) {
        self.release_pointer();
    }

    // -----------------------------------------------------------------------
    // Ticks
    // -----------------------------------------------------------------------

    /// Fast tick. `cursor` is the physical pointer position.
    pub fn step(&mut self, now: f64, cursor: Vec2) {
        self.cursor = cursor;

        while let Ok(cmd) = self.inbox.try_recv() {
            match cmd {
                Command::Deescalate => self.begin_exit(now),
            }
        }

        self.trail.purge_expired(now);

        match self.mode {
            Mode::Idle => {}
            Mode::Following => self.chase(cursor, ClampPolicy::Settle, now),
            Mode::Rampage => self.chase(cursor, ClampPolicy::Continuous, now),
            Mode::Takeover(t) => self.step_takeover(t, now),
            Mode::RampageExit(path) => self.step_exit(path, now),
            Mode::ScriptedRun(run) => self.step_run(run, now),
        }
    }

    /// Slow tick: fire every due timer, earliest first.
    pub fn tick_timers(&mut self, now: f64) {
        for kind in self.timers.take_due(now) {
            log::debug!("timer {} fired in {}", kind.label(), self.mode.kind().label());
            match kind {
                TimerKind::TakeoverStart => self.begin_takeover(now),
                TimerKind::DialogShow => self.show_dialog(now),
                TimerKind::DialogHide => self.hide_dialog(now),
                TimerKind::RampageArm => self.activate_rampage(now),
                TimerKind::ScriptedRun => self.begin_run(now),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mode handlers
    // -----------------------------------------------------------------------

    fn chase(&mut self, toward: Vec2, clamp: ClampPolicy, now: f64) {
        let target = physics::follow_target(toward, self.config.sprite_size);
        self.body.integrate(target, &self.tuning, clamp);
        let sample = self.body.sample(&self.tuning);
        self.leave_paw(sample, now);
    }

    fn step_takeover(&mut self, takeover: Takeover, now: f64) {
        if now - takeover.started >= takeover.duration {
            self.end_takeover(takeover, now);
            return;
        }

        match self.arbiter.drive_towards(now) {
            Ok(Drive::LegComplete) | Ok(Drive::Idle) => {
                let from = self.arbiter.pointer();
                self.arbiter
                    .begin_leg(from, &self.screen.available, now, &mut self.rng);
            }
            Ok(Drive::Moving) => {}
            Err(e) => log::warn!("Pointer drive failed: {e}"),
        }

        let pointer = self.arbiter.pointer();
        self.chase(pointer, ClampPolicy::Continuous, now);
    }

    fn step_exit(&mut self, path: LinearPath, now: f64) {
        if now >= path.end_time() {
            self.body.place(path.to);
            self.finish_exit(now);
        } else {
            self.body.slide_to(path.point_at(path.progress(now).max(0.0)));
        }
    }

    fn step_run(&mut self, mut run: ScriptedRun, now: f64) {
        if let Some(until) = run.hold_until {
            if now >= until {
                self.enter(Mode::Idle);
                self.arm_next_run(now);
            }
            return;
        }

        if now >= run.path.end_time() {
            self.body.place(run.path.to);
            run.hold_until = Some(now + RUN_HOLD);
            log::debug!("Run complete at t={now:.2}, holding off-screen");
        } else {
            self.body
                .slide_to(run.path.point_at(run.path.progress(now).max(0.0)));
            let approx_speed =
                run.path.length() / run.path.duration as f32 / RUN_SPEED_SCALE;
            let sample = self.body.scripted_sample();
            self.leave_paw(
                MotionSample {
                    speed: approx_speed,
                    ..sample
                },
                now,
            );
        }
        self.mode = Mode::ScriptedRun(run);
    }

    fn leave_paw(&mut self, sample: MotionSample, now: f64) {
        let size = self.config.sprite_size;
        let anchor = self.body.position + Vec2::new(size.x * 0.5, size.y)
            - self.config.mark_size * 0.5;
        self.trail.maybe_spawn(
            anchor,
            sample.velocity,
            sample.speed,
            sample.acceleration,
            now,
        );
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn enter(&mut self, mode: Mode) {
        let (from, to) = (self.mode.kind(), mode.kind());
        if from != to {
            log::info!("Mode {} -> {}", from.label(), to.label());
        }
        self.mode = mode;
    }

    fn arm_rampage(&mut self, now: f64) {
        let (lo, hi) = self.config.rampage_delay;
        let delay = lo + self.rng.f64() * (hi - lo);
        self.timers.arm(TimerKind::RampageArm, now + delay);
        log::info!("Next rampage in {delay:.0}s");
    }

    fn arm_next_run(&mut self, now: f64) {
        if !self.can_trigger_run {
            return;
        }
        let (lo, hi) = self.config.run_gap;
        let delay = lo + self.rng.f64() * (hi - lo);
        self.timers.arm(TimerKind::ScriptedRun, now + delay);
    }

    /// `TakeoverStart` is only scheduled during a rampage, but a takeover
    /// fired from `Following` is honored and hands back to `Following`.
    fn begin_takeover(&mut self, now: f64) {
        let escalated = match self.mode {
            Mode::Rampage => true,
            Mode::Following => false,
            _ => {
                log::debug!("Takeover ignored in {}", self.mode.kind().label());
                return;
            }
        };

        if let Err(e) = self.arbiter.acquire() {
            log::warn!("Pointer block unavailable, takeover runs without it: {e}");
        }

        let size = self.config.sprite_size;
        self.body.place(self.screen.available.center() - size * 0.5);

        let (lo, hi) = TAKEOVER_DURATION;
        let duration = lo + self.rng.f64() * (hi - lo);
        let from = self.cursor;
        self.arbiter
            .begin_leg(from, &self.screen.available, now, &mut self.rng);

        self.enter(Mode::Takeover(Takeover {
            started: now,
            duration,
            escalated,
        }));
        log::info!("Takeover for {duration:.1}s");
    }

    fn end_takeover(&mut self, takeover: Takeover, now: f64) {
        self.release_pointer();
        if takeover.escalated {
            self.enter(Mode::Rampage);
            let delay = self.schedule.next_takeover_delay(true, &mut self.rng);
            self.timers.arm(TimerKind::TakeoverStart, now + delay);
            log::info!(
                "Next takeover in {delay:.1}s (factor {:.3})",
                self.schedule.factor().takeover
            );
        } else {
            self.enter(Mode::Following);
        }
    }

    fn release_pointer(&mut self) {
        if let Err(e) = self.arbiter.release() {
            log::error!("Pointer release failed, forced restore applied: {e}");
        }
    }

    fn show_dialog(&mut self, now: f64) {
        if !self.mode.is_escalated() {
            return;
        }
        let line = DIALOG_LINES[self.rng.usize(0..DIALOG_LINES.len())];
        self.dialog = Some(line);
        self.timers.arm(TimerKind::DialogHide, now + DIALOG_VISIBLE);
    }

    fn hide_dialog(&mut self, now: f64) {
        self.dialog = None;
        if !self.mode.is_escalated() {
            return;
        }
        let delay = self.schedule.next_dialog_delay(true, &mut self.rng);
        self.timers.arm(TimerKind::DialogShow, now + delay);
    }

    fn begin_exit(&mut self, now: f64) {
        if !self.mode.is_escalated() {
            log::debug!("De-escalate ignored in {}", self.mode.kind().label());
            return;
        }

        // Pointer first: nothing else happens while the user's mouse is held.
        self.release_pointer();

        self.dialog = None;
        self.timers.disarm(TimerKind::DialogShow);
        self.timers.disarm(TimerKind::DialogHide);
        self.timers.disarm(TimerKind::TakeoverStart);

        let to = self.screen.random_offscreen_point(EXIT_MARGIN, &mut self.rng);
        let from = self.body.position;
        self.body.place(from);
        self.enter(Mode::RampageExit(LinearPath {
            from,
            to,
            start: now,
            duration: EXIT_DURATION,
        }));
        log::info!("Gifts collected, retreating to {to}");
    }

    fn finish_exit(&mut self, now: f64) {
        self.schedule.reset();
        self.can_trigger_run = true;
        self.enter(Mode::Idle);
        self.arm_rampage(now);
        self.arm_next_run(now);
    }

    fn begin_run(&mut self, now: f64) {
        if !self.can_trigger_run || self.mode != Mode::Idle {
            log::debug!("Scripted run skipped in {}", self.mode.kind().label());
            return;
        }
        let edge = if self.rng.bool() { Edge::Left } else { Edge::Right };
        let margin = self.config.sprite_size.x + 10.0;
        let from = self.screen.offscreen_point(edge, margin, &mut self.rng);
        let to = self
            .screen
            .offscreen_point(edge.opposite(), margin, &mut self.rng);

        self.body.place(from);
        self.enter(Mode::ScriptedRun(ScriptedRun {
            path: LinearPath {
                from,
                to,
                start: now,
                duration: RUN_DURATION,
            },
            hold_until: None,
        }));
    }

    // -----------------------------------------------------------------------
    // Renderer contract
    // -----------------------------------------------------------------------

    pub fn frame(&self, now: f64) -> Frame {
        let sprite = Rect::at(self.body.position, self.config.sprite_size);
        let marks = self
            .trail
            .live(now)
            .map(|m| MarkView {
                rect: Rect::at(m.pos, self.config.mark_size),
                angle_degrees: m.angle_degrees,
                alpha: m.alpha(now),
            })
            .collect();

        let bubble = match (self.mode, self.dialog) {
            (Mode::Rampage, Some(text)) => {
                let size = self.config.bubble_size;
                let pos = self.body.position
                    + Vec2::new(self.config.sprite_size.x * 0.5 - size.x * 0.5, -size.y);
                Some(Bubble {
                    text,
                    rect: Rect::at(pos, size),
                })
            }
            _ => None,
        };

        Frame {
            mode: self.mode.kind(),
            sprite,
            marks,
            bubble,
        }
    }
}

#[cfg(test)]
mod tests;
