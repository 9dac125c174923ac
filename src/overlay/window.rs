//! Surface operations on the overlay's own window.
//!
//! The window handle only exists once the UI framework has created its
//! surface, so the production [`OverlayWindow`] carries a late-bound handle
//! slot. Every show goes through the no-activate path; the overlay must never
//! take focus just by appearing.

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use crate::focus::window_ref::WindowId;
use crate::visibility::OverlayWindow;

/// Gap between the overlay and the bottom edge of the work area.
const DOCK_MARGIN: i32 = 8;

/// Where to place a window of `size` docked at the bottom of `work_area`
/// (left, top, right, bottom), centered horizontally.
pub fn docked_origin(work_area: (i32, i32, i32, i32), size: (i32, i32)) -> (i32, i32) {
    let (left, _top, right, bottom) = work_area;
    let (width, height) = size;
    let x = left + ((right - left) - width) / 2;
    let y = bottom - height - DOCK_MARGIN;
    (x.max(left), y)
}

pub struct Win32OverlayWindow {
    hwnd: AtomicIsize,
}

impl Default for Win32OverlayWindow {
    fn default() -> Self {
        Self {
            hwnd: AtomicIsize::new(0),
        }
    }
}

impl Win32OverlayWindow {
    /// Bind the handle once the frame exists.
    pub fn attach(&self, id: WindowId) {
        self.hwnd.store(id, Ordering::Release);
    }

    pub fn id(&self) -> Option<WindowId> {
        match self.hwnd.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }
}

impl OverlayWindow for Arc<Win32OverlayWindow> {
    #[cfg(windows)]
    fn position_for_typing(&self) {
        use windows::Win32::Foundation::{HWND, RECT};
        use windows::Win32::Graphics::Gdi::{
            GetMonitorInfoW, MonitorFromWindow, MONITORINFO, MONITOR_DEFAULTTONEAREST,
        };
        use windows::Win32::UI::WindowsAndMessaging::{
            GetWindowRect, SetWindowPos, HWND_TOPMOST, SWP_NOACTIVATE, SWP_NOSIZE,
        };

        let Some(id) = self.id() else {
            return;
        };
        let hwnd = HWND(id as *mut core::ffi::c_void);
        unsafe {
            let monitor = MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST);
            if monitor.0.is_null() {
                return;
            }
            let mut info = MONITORINFO {
                cbSize: std::mem::size_of::<MONITORINFO>() as u32,
                ..Default::default()
            };
            if !GetMonitorInfoW(monitor, &mut info).as_bool() {
                return;
            }
            let mut rect = RECT::default();
            if GetWindowRect(hwnd, &mut rect).is_err() {
                return;
            }

            let work = info.rcWork;
            let (x, y) = docked_origin(
                (work.left, work.top, work.right, work.bottom),
                (rect.right - rect.left, rect.bottom - rect.top),
            );
            let _ = SetWindowPos(hwnd, HWND_TOPMOST, x, y, 0, 0, SWP_NOSIZE | SWP_NOACTIVATE);
        }
    }

    #[cfg(not(windows))]
    fn position_for_typing(&self) {}

    #[cfg(windows)]
    fn show_without_activation(&self) {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::{
            SetWindowPos, ShowWindow, HWND_TOPMOST, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
            SWP_SHOWWINDOW, SW_SHOWNOACTIVATE,
        };

        let Some(id) = self.id() else {
            return;
        };
        let hwnd = HWND(id as *mut core::ffi::c_void);
        unsafe {
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
            let _ = SetWindowPos(
                hwnd,
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_SHOWWINDOW,
            );
        }
    }

    #[cfg(not(windows))]
    fn show_without_activation(&self) {}

    #[cfg(windows)]
    fn hide(&self) {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::{ShowWindow, SW_HIDE};

        let Some(id) = self.id() else {
            return;
        };
        unsafe {
            let _ = ShowWindow(HWND(id as *mut core::ffi::c_void), SW_HIDE);
        }
    }

    #[cfg(not(windows))]
    fn hide(&self) {}
}

/// Extract the overlay's window handle from an eframe [`Frame`].
#[cfg(windows)]
pub fn frame_window_id(frame: &eframe::Frame) -> Option<WindowId> {
    use raw_window_handle::{HasWindowHandle, RawWindowHandle};

    frame.window_handle().ok().and_then(|wh| match wh.as_raw() {
        RawWindowHandle::Win32(handle) => Some(handle.hwnd.get() as WindowId),
        _ => None,
    })
}

#[cfg(not(windows))]
pub fn frame_window_id(_frame: &eframe::Frame) -> Option<WindowId> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docks_centered_above_bottom_edge() {
        let (x, y) = docked_origin((0, 0, 1920, 1040), (900, 300));
        assert_eq!(x, 510);
        assert_eq!(y, 1040 - 300 - DOCK_MARGIN);
    }

    #[test]
    fn oversized_window_clamps_to_left_edge() {
        let (x, _) = docked_origin((100, 0, 500, 800), (600, 200));
        assert_eq!(x, 100);
    }

    #[test]
    fn unattached_window_reports_no_id() {
        let window = Win32OverlayWindow::default();
        assert_eq!(window.id(), None);
        window.attach(42);
        assert_eq!(window.id(), Some(42));
    }
}
