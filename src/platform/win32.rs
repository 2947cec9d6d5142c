use glam::Vec2;
use windows::Win32::Foundation::{BOOL, HINSTANCE, LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetCursorPos, SetCursorPos, SetWindowsHookExW, ShowCursor,
    UnhookWindowsHookEx, HC_ACTION, HHOOK, LLMHF_INJECTED, MSLLHOOKSTRUCT, WH_MOUSE_LL,
    WM_MOUSEMOVE,
};

use crate::pointer::{PointerBackend, PointerError};

/// ShowCursor keeps a per-thread display counter; bound the loops that walk it.
const SHOW_COUNTER_LIMIT: usize = 64;

/// Get the current global mouse cursor position in screen pixels.
pub fn get_mouse_pos() -> (f32, f32) {
    let mut point = POINT::default();
    unsafe {
        let _ = GetCursorPos(&mut point);
    }
    (point.x as f32, point.y as f32)
}

/// Check if the ESC key is currently pressed (works regardless of window focus).
pub fn is_escape_pressed() -> bool {
    // VK_ESCAPE = 0x1B. High bit set = key is currently down.
    unsafe { GetAsyncKeyState(0x1B) & (0x8000u16 as i16) != 0 }
}

/// Check if F11 is held (resume-follow hotkey).
pub fn is_f11_down() -> bool {
    // VK_F11 = 0x7A
    unsafe { GetAsyncKeyState(0x7A) & (0x8000u16 as i16) != 0 }
}

/// Check if F12 is held (local cancel hotkey).
pub fn is_f12_down() -> bool {
    // VK_F12 = 0x7B
    unsafe { GetAsyncKeyState(0x7B) & (0x8000u16 as i16) != 0 }
}

// ---------------------------------------------------------------------------
// Pointer takeover
// ---------------------------------------------------------------------------

/// Swallows physical mouse movement. Synthetic moves (flagged injected) and
/// every button/wheel event pass through.
unsafe extern "system" fn block_mouse_move(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 && wparam.0 as u32 == WM_MOUSEMOVE {
        let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
        if info.flags & LLMHF_INJECTED == 0 {
            return LRESULT(1);
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

/// Real pointer backend: a low-level mouse hook plus the ShowCursor counter.
///
/// The hook only runs while the installing thread pumps messages, so this
/// must live on the event loop thread.
#[derive(Default)]
pub struct Win32Pointer {
    hook: Option<HHOOK>,
    hidden: bool,
}

impl Win32Pointer {
    pub fn new() -> Self {
        Self::default()
    }

    fn walk_counter(visible: bool) {
        for _ in 0..SHOW_COUNTER_LIMIT {
            let count = unsafe { ShowCursor(BOOL::from(visible)) };
            let done = if visible { count >= 0 } else { count < 0 };
            if done {
                return;
            }
        }
        log::warn!("ShowCursor counter did not settle (visible={visible})");
    }
}

impl PointerBackend for Win32Pointer {
    fn install_filter(&mut self) -> Result<(), PointerError> {
        if self.hook.is_some() {
            return Ok(());
        }
        let hook = unsafe {
            let module = GetModuleHandleW(None)
                .map_err(|e| PointerError::FilterInstall(e.to_string()))?;
            SetWindowsHookExW(WH_MOUSE_LL, Some(block_mouse_move), HINSTANCE(module.0), 0)
                .map_err(|e| PointerError::FilterInstall(e.to_string()))?
        };
        log::info!("Mouse hook installed");
        self.hook = Some(hook);
        Ok(())
    }

    fn remove_filter(&mut self) -> Result<(), PointerError> {
        if let Some(hook) = self.hook.take() {
            unsafe { UnhookWindowsHookEx(hook) }
                .map_err(|e| PointerError::FilterRemove(e.to_string()))?;
            log::info!("Mouse hook removed");
        }
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), PointerError> {
        if self.hidden != visible {
            return Ok(());
        }
        Self::walk_counter(visible);
        self.hidden = !visible;
        Ok(())
    }

    fn set_position(&mut self, pos: Vec2) -> Result<(), PointerError> {
        unsafe { SetCursorPos(pos.x.round() as i32, pos.y.round() as i32) }
            .map_err(|e| PointerError::Position(e.to_string()))
    }

    fn force_restore(&mut self) {
        if let Some(hook) = self.hook.take() {
            let _ = unsafe { UnhookWindowsHookEx(hook) };
        }
        Self::walk_counter(true);
        self.hidden = false;
    }
}

impl Drop for Win32Pointer {
    fn drop(&mut self) {
        if self.hook.is_some() || self.hidden {
            self.force_restore();
        }
    }
}
