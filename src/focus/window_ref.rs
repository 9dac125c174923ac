//! Cheap, copyable identity for an external top-level window.
//!
//! A `WindowRef` is a snapshot: the handle plus the metadata captured when the
//! window was observed. Whether the window still exists is a property of the
//! desktop, not of this struct, so callers re-check through [`WindowRef::is_alive`]
//! at the point of use instead of trusting anything cached here.

/// Raw window handle value, kept as an integer so the type crosses threads and
/// compiles on every platform.
pub type WindowId = isize;

#[derive(Debug, Clone)]
pub struct WindowRef {
    pub id: WindowId,
    /// Thread that owns the window's input queue.
    pub thread_id: u32,
    pub process_id: u32,
    pub class_name: String,
    /// When this window was last observed alive. Metadata only; liveness is
    /// always re-checked through [`WindowRef::is_alive`].
    pub seen_at: std::time::Instant,
}

/// Identity is the handle plus its metadata; the observation timestamp does
/// not distinguish two sightings of the same window.
impl PartialEq for WindowRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.thread_id == other.thread_id
            && self.process_id == other.process_id
            && self.class_name == other.class_name
    }
}

impl Eq for WindowRef {}

impl WindowRef {
    pub fn new(id: WindowId, thread_id: u32, process_id: u32, class_name: impl Into<String>) -> Self {
        Self {
            id,
            thread_id,
            process_id,
            class_name: class_name.into(),
            seen_at: std::time::Instant::now(),
        }
    }

    /// Capture a reference for the top-level ancestor of `id`, with its owning
    /// thread, process, and class name. Returns `None` for a dead handle.
    #[cfg(windows)]
    pub fn capture(id: WindowId) -> Option<Self> {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::{
            GetAncestor, GetClassNameW, GetWindowThreadProcessId, IsWindow, GA_ROOT,
        };

        let hwnd = HWND(id as *mut core::ffi::c_void);
        unsafe {
            if !IsWindow(hwnd).as_bool() {
                return None;
            }
            let root = GetAncestor(hwnd, GA_ROOT);
            let root = if root.0.is_null() { hwnd } else { root };

            let mut pid = 0u32;
            let thread_id = GetWindowThreadProcessId(root, Some(&mut pid));
            if thread_id == 0 {
                return None;
            }

            let mut class_buf = [0u16; 256];
            let class_len = GetClassNameW(root, &mut class_buf) as usize;
            let class_name = String::from_utf16_lossy(&class_buf[..class_len]);

            Some(Self::new(root.0 as isize, thread_id, pid, class_name))
        }
    }

    #[cfg(not(windows))]
    pub fn capture(_id: WindowId) -> Option<Self> {
        None
    }

    /// Existence-and-visibility check against the live desktop. This is the
    /// only validity signal anything in the crate trusts.
    #[cfg(windows)]
    pub fn is_alive(&self) -> bool {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::{IsWindow, IsWindowVisible};

        let hwnd = HWND(self.id as *mut core::ffi::c_void);
        unsafe { IsWindow(hwnd).as_bool() && IsWindowVisible(hwnd).as_bool() }
    }

    #[cfg(not(windows))]
    pub fn is_alive(&self) -> bool {
        false
    }
}

/// Desktop-shell surfaces that must never become a restoration target.
const SHELL_CLASSES: &[&str] = &[
    "Shell_TrayWnd",
    "Shell_SecondaryTrayWnd",
    "TrayNotifyWnd",
    "NotifyIconOverflowWindow",
    "Progman",
    "WorkerW",
    "Button", // the Start orb on older shells
];

pub fn is_shell_class(class_name: &str) -> bool {
    SHELL_CLASSES
        .iter()
        .any(|shell| class_name.eq_ignore_ascii_case(shell))
}
