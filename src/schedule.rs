/// Base wait between takeovers (seconds).
const TAKEOVER_RANGE: (f64, f64) = (30.0, 180.0);
/// Base wait between speech bubbles (seconds).
const DIALOG_RANGE: (f64, f64) = (5.0, 7.0);
/// Per-reschedule shrink while escalated.
const TAKEOVER_DECAY: f64 = 0.9;
const DIALOG_DECAY: f64 = 0.75;
/// Factors never shrink below this.
const MIN_FACTOR: f64 = 0.1;
/// No escalated delay is ever shorter than this (seconds).
const MIN_DELAY: f64 = 1.0;

/// Interval multipliers that shrink while the rampage goes on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscalationFactor {
    pub dialog: f64,
    pub takeover: f64,
}

impl Default for EscalationFactor {
    fn default() -> Self {
        Self {
            dialog: 1.0,
            takeover: 1.0,
        }
    }
}

/// Randomized waits for the two recurring rampage effects.
pub struct ScheduleController {
    factor: EscalationFactor,
}

fn scaled_range(base: (f64, f64), factor: f64) -> (f64, f64) {
    ((base.0 * factor).max(MIN_DELAY), (base.1 * factor).max(MIN_DELAY))
}

fn draw(range: (f64, f64), rng: &mut fastrand::Rng) -> f64 {
    range.0 + rng.f64() * (range.1 - range.0)
}

impl ScheduleController {
    pub fn new() -> Self {
        Self {
            factor: EscalationFactor::default(),
        }
    }

    pub fn factor(&self) -> EscalationFactor {
        self.factor
    }

    /// Range the next takeover delay would be drawn from at the current factor.
    pub fn takeover_range(&self) -> (f64, f64) {
        scaled_range(TAKEOVER_RANGE, self.factor.takeover)
    }

    pub fn dialog_range(&self) -> (f64, f64) {
        scaled_range(DIALOG_RANGE, self.factor.dialog)
    }

    /// Seconds until the next takeover. Escalated calls shrink the factor
    /// first, so the cadence speeds up the longer the rampage lasts.
    pub fn next_takeover_delay(&mut self, escalated: bool, rng: &mut fastrand::Rng) -> f64 {
        if !escalated {
            return draw(TAKEOVER_RANGE, rng);
        }
        self.factor.takeover = (self.factor.takeover * TAKEOVER_DECAY).max(MIN_FACTOR);
        draw(self.takeover_range(), rng)
    }

    pub fn next_dialog_delay(&mut self, escalated: bool, rng: &mut fastrand::Rng) -> f64 {
        if !escalated {
            return draw(DIALOG_RANGE, rng);
        }
        self.factor.dialog = (self.factor.dialog * DIALOG_DECAY).max(MIN_FACTOR);
        draw(self.dialog_range(), rng)
    }

    /// Escalation over: back to base cadence.
    pub fn reset(&mut self) {
        self.factor = EscalationFactor::default();
    }
}

// ---------------------------------------------------------------------------
// Single-shot timers
// ---------------------------------------------------------------------------

/// Every deferred transition the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimerKind {
    TakeoverStart = 0,
    DialogShow = 1,
    DialogHide = 2,
    RampageArm = 3,
    ScriptedRun = 4,
}

impl TimerKind {
    pub const ALL: [TimerKind; 5] = [
        Self::TakeoverStart,
        Self::DialogShow,
        Self::DialogHide,
        Self::RampageArm,
        Self::ScriptedRun,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::TakeoverStart => "takeover",
            Self::DialogShow => "dialog-show",
            Self::DialogHide => "dialog-hide",
            Self::RampageArm => "rampage",
            Self::ScriptedRun => "scripted-run",
        }
    }
}

/// One optional due time per timer kind. Re-arming replaces the due time.
#[derive(Debug, Default)]
pub struct Timers {
    due: [Option<f64>; 5],
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: TimerKind, at: f64) {
        log::debug!("timer {} armed for t={at:.2}", kind.label());
        self.due[kind as usize] = Some(at);
    }

    pub fn disarm(&mut self, kind: TimerKind) {
        self.due[kind as usize] = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.due[kind as usize].is_some()
    }

    #[cfg(test)]
    pub fn due_at(&self, kind: TimerKind) -> Option<f64> {
        self.due[kind as usize]
    }

    /// Disarm and return every timer due at `now`, earliest first.
    pub fn take_due(&mut self, now: f64) -> Vec<TimerKind> {
        let mut fired: Vec<(f64, TimerKind)> = TimerKind::ALL
            .iter()
            .filter_map(|&k| self.due[k as usize].filter(|&at| at <= now).map(|at| (at, k)))
            .collect();
        fired.sort_by(|a, b| a.0.total_cmp(&b.0));
        for &(_, k) in &fired {
            self.disarm(k);
        }
        fired.into_iter().map(|(_, k)| k).collect()
    }
}
