use glam::Vec2;
use thiserror::Error;

use crate::geometry::{LinearPath, Rect};

/// Shortest and longest duration of one drag leg (seconds).
const LEG_MIN: f64 = 0.5;
const LEG_MAX: f64 = 2.0;
/// Chance a new drag target is a screen corner.
const CORNER_CHANCE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum PointerError {
    #[error("failed to install pointer filter: {0}")]
    FilterInstall(String),
    #[error("failed to remove pointer filter: {0}")]
    FilterRemove(String),
    #[error("failed to change cursor visibility: {0}")]
    Visibility(String),
    #[error("failed to move cursor: {0}")]
    Position(String),
}

/// Platform side of pointer control.
///
/// `force_restore` must leave the pointer visible and unfiltered no matter
/// what state the other calls left it in. It is the last line before the
/// user's mouse is stuck.
pub trait PointerBackend {
    fn install_filter(&mut self) -> Result<(), PointerError>;
    fn remove_filter(&mut self) -> Result<(), PointerError>;
    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), PointerError>;
    fn set_position(&mut self, pos: Vec2) -> Result<(), PointerError>;
    fn force_restore(&mut self);
}

/// Backend that does nothing. Used off Windows and when the platform
/// refuses hooks entirely.
#[derive(Debug, Default)]
pub struct NullPointer;

impl PointerBackend for NullPointer {
    fn install_filter(&mut self) -> Result<(), PointerError> {
        Err(PointerError::FilterInstall(
            "pointer filtering is not supported on this platform".into(),
        ))
    }

    fn remove_filter(&mut self) -> Result<(), PointerError> {
        Ok(())
    }

    fn set_cursor_visible(&mut self, _visible: bool) -> Result<(), PointerError> {
        Ok(())
    }

    fn set_position(&mut self, _pos: Vec2) -> Result<(), PointerError> {
        Ok(())
    }

    fn force_restore(&mut self) {}
}

/// One linear drag leg.
pub type CursorPath = LinearPath;

/// Outcome of one `drive_towards` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    Moving,
    LegComplete,
    /// No leg is active.
    Idle,
}

/// 50% a corner of `bounds`, otherwise anywhere inside it.
pub fn pick_random_target(bounds: &Rect, rng: &mut fastrand::Rng) -> Vec2 {
    if rng.f32() < CORNER_CHANCE {
        bounds.corners()[rng.usize(0..4)]
    } else {
        bounds.random_point(rng)
    }
}

/// Exclusive owner of the system pointer during a takeover.
pub struct CursorArbiter<B: PointerBackend> {
    backend: B,
    acquired: bool,
    filter_installed: bool,
    pointer_visible: bool,
    path: Option<CursorPath>,
    pointer: Vec2,
}

impl<B: PointerBackend> CursorArbiter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            acquired: false,
            filter_installed: false,
            pointer_visible: true,
            path: None,
            pointer: Vec2::ZERO,
        }
    }

    #[cfg(test)]
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    #[cfg(test)]
    pub fn is_filter_installed(&self) -> bool {
        self.filter_installed
    }

    #[cfg(test)]
    pub fn is_pointer_visible(&self) -> bool {
        self.pointer_visible
    }

    /// Last position the arbiter put the pointer at.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    #[cfg(test)]
    pub fn path(&self) -> Option<&CursorPath> {
        self.path.as_ref()
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Start blocking physical pointer moves and hide the glyph.
    ///
    /// A second call while acquired does nothing. If the filter cannot be
    /// installed the arbiter is still considered acquired (the pointer can be
    /// driven) but physical input keeps flowing.
    pub fn acquire(&mut self) -> Result<(), PointerError> {
        if self.acquired {
            return Ok(());
        }
        self.acquired = true;

        self.backend.install_filter()?;
        self.filter_installed = true;

        self.backend.set_cursor_visible(false)?;
        self.pointer_visible = false;
        Ok(())
    }

    /// Give the pointer back. Idempotent.
    ///
    /// On any backend error the pointer is force-restored before the error
    /// is returned, so the user's mouse is never left blocked.
    pub fn release(&mut self) -> Result<(), PointerError> {
        self.path = None;
        if !self.acquired && !self.filter_installed && self.pointer_visible {
            return Ok(());
        }

        let result = self.try_release();
        if result.is_err() {
            self.backend.force_restore();
        }
        self.acquired = false;
        self.filter_installed = false;
        self.pointer_visible = true;
        result
    }

    fn try_release(&mut self) -> Result<(), PointerError> {
        if self.filter_installed {
            self.backend.remove_filter()?;
            self.filter_installed = false;
        }
        if !self.pointer_visible {
            self.backend.set_cursor_visible(true)?;
            self.pointer_visible = true;
        }
        Ok(())
    }

    /// Begin a new leg from `from` to a random target inside `bounds`, with a
    /// random duration.
    pub fn begin_leg(&mut self, from: Vec2, bounds: &Rect, now: f64, rng: &mut fastrand::Rng) {
        let to = pick_random_target(bounds, rng);
        let duration = LEG_MIN + rng.f64() * (LEG_MAX - LEG_MIN);
        self.pointer = from;
        self.path = Some(CursorPath {
            from,
            to,
            start: now,
            duration,
        });
    }

    /// Move the synthetic pointer along the active leg.
    pub fn drive_towards(&mut self, now: f64) -> Result<Drive, PointerError> {
        let Some(path) = self.path else {
            return Ok(Drive::Idle);
        };

        let t = path.progress(now);
        let (pos, drive) = if t >= 1.0 {
            (path.to, Drive::LegComplete)
        } else {
            (path.point_at(t.max(0.0)), Drive::Moving)
        };

        self.pointer = pos;
        if drive == Drive::LegComplete {
            self.path = None;
        }
        self.backend.set_position(pos)?;
        Ok(drive)
    }
}

impl<B: PointerBackend> Drop for CursorArbiter<B> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::error!("Pointer release on shutdown failed (forced restore applied): {e}");
        }
    }
}
