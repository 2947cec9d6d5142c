use crate::geometry::LinearPath;

/// Behavioral mode. Exactly one is active; each variant carries the
/// transient state that only exists while it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Off-duty: sprite parked off-screen, scripted runs may start.
    Idle,
    /// Calm cursor chase that settles.
    Following,
    /// Engine owns the system pointer.
    Takeover(Takeover),
    /// Escalated chase with dialogs and takeovers.
    Rampage,
    /// Retreat off-screen after the rampage was cancelled.
    RampageExit(LinearPath),
    /// Scripted dash between two off-screen points.
    ScriptedRun(ScriptedRun),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Takeover {
    pub started: f64,
    pub duration: f64,
    /// Entered from `Rampage`; decides where control goes afterwards.
    pub escalated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedRun {
    pub path: LinearPath,
    /// Set once the path is complete; the run ends at this time.
    pub hold_until: Option<f64>,
}

/// Payload-free mode tag for the renderer and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Idle,
    Following,
    Takeover,
    Rampage,
    RampageExit,
    ScriptedRun,
}

impl ModeKind {
    pub fn label(self) -> &'static str {
        match self {
            ModeKind::Idle => "Idle",
            ModeKind::Following => "Following",
            ModeKind::Takeover => "Takeover",
            ModeKind::Rampage => "Rampage",
            ModeKind::RampageExit => "RampageExit",
            ModeKind::ScriptedRun => "ScriptedRun",
        }
    }
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Idle => ModeKind::Idle,
            Mode::Following => ModeKind::Following,
            Mode::Takeover(_) => ModeKind::Takeover,
            Mode::Rampage => ModeKind::Rampage,
            Mode::RampageExit(_) => ModeKind::RampageExit,
            Mode::ScriptedRun(_) => ModeKind::ScriptedRun,
        }
    }

    /// True while a rampage is in progress, including takeovers it started.
    pub fn is_escalated(&self) -> bool {
        match self {
            Mode::Rampage => true,
            Mode::Takeover(t) => t.escalated,
            _ => false,
        }
    }
}
