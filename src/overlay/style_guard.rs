//! Keeps the overlay window non-activating, topmost, and out of the taskbar.
//!
//! The UI framework can silently rewrite extended window styles during its own
//! layout or surface re-creation, so the required bits are reconciled on a
//! periodic tick rather than set once. Writes only happen when the computed
//! union differs from what the window currently carries.

use crate::focus::window_ref::WindowId;

/// WS_EX_NOACTIVATE | WS_EX_TOPMOST | WS_EX_TOOLWINDOW, mirrored as plain
/// bits so the reconciliation math is testable anywhere.
pub const STYLE_NO_ACTIVATE: u32 = 0x0800_0000;
pub const STYLE_TOPMOST: u32 = 0x0000_0008;
pub const STYLE_TOOL_WINDOW: u32 = 0x0000_0080;

pub const REQUIRED_STYLE_BITS: u32 = STYLE_NO_ACTIVATE | STYLE_TOPMOST | STYLE_TOOL_WINDOW;

/// The write needed to bring `current` into compliance, or `None` when the
/// window already carries every required bit.
pub fn reconciled_style(current: u32) -> Option<u32> {
    let desired = current | REQUIRED_STYLE_BITS;
    (desired != current).then_some(desired)
}

pub struct ActivationStyleGuard {
    window: WindowId,
}

impl ActivationStyleGuard {
    pub fn new(window: WindowId) -> Self {
        Self { window }
    }

    /// One-time application at window creation.
    pub fn apply(&self) {
        if self.reconcile() {
            tracing::debug!(id = self.window, "activation styles applied");
        }
    }

    /// Periodic repair; logs only when something had drifted.
    pub fn enforce(&self) {
        if self.reconcile() {
            tracing::debug!(id = self.window, "activation styles drifted, reapplied");
        }
    }

    /// Diagnostic check without writing anything.
    pub fn verify(&self) -> bool {
        match read_style(self.window) {
            Some(current) => reconciled_style(current).is_none(),
            None => false,
        }
    }

    /// Returns whether a write happened.
    fn reconcile(&self) -> bool {
        let Some(current) = read_style(self.window) else {
            return false;
        };
        match reconciled_style(current) {
            Some(desired) => {
                write_style(self.window, desired);
                true
            }
            None => false,
        }
    }
}

#[cfg(windows)]
fn read_style(window: WindowId) -> Option<u32> {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{GetWindowLongPtrW, IsWindow, GWL_EXSTYLE};

    let hwnd = HWND(window as *mut core::ffi::c_void);
    unsafe {
        if !IsWindow(hwnd).as_bool() {
            return None;
        }
        Some(GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32)
    }
}

#[cfg(windows)]
fn write_style(window: WindowId, style: u32) {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{SetWindowLongPtrW, GWL_EXSTYLE};

    let hwnd = HWND(window as *mut core::ffi::c_void);
    unsafe {
        SetWindowLongPtrW(hwnd, GWL_EXSTYLE, style as isize);
    }
}

#[cfg(not(windows))]
fn read_style(_window: WindowId) -> Option<u32> {
    None
}

#[cfg(not(windows))]
fn write_style(_window: WindowId, _style: u32) {}
