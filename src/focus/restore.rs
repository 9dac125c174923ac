//! Cross-thread activation transfer.
//!
//! Activating a window owned by another thread requires temporarily sharing
//! that thread's input state. The attach/detach pair is a scoped guard so the
//! detach runs on every exit path; two threads left attached would entangle
//! their focus handling for the rest of the session, desktop-wide.

use crate::focus::window_ref::{WindowId, WindowRef};

/// How long to let the OS settle before the post-condition read.
#[cfg(windows)]
const SETTLE_DELAY: std::time::Duration = std::time::Duration::from_millis(50);

/// Platform seam for every OS call the protocol makes.
pub trait ActivationBackend: Send + Sync {
    fn foreground_window(&self) -> Option<WindowId>;
    fn current_thread(&self) -> u32;
    /// Owning input thread of the window, `None` if the window is gone.
    fn window_thread(&self, window: WindowId) -> Option<u32>;
    fn attach_input(&self, from_thread: u32, to_thread: u32) -> bool;
    fn detach_input(&self, from_thread: u32, to_thread: u32);
    fn raise(&self, window: WindowId);
    fn activate(&self, window: WindowId) -> bool;
    fn settle(&self);
}

/// Detaches on drop, including on early returns.
struct AttachGuard<'a> {
    backend: &'a dyn ActivationBackend,
    from_thread: u32,
    to_thread: u32,
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        self.backend.detach_input(self.from_thread, self.to_thread);
    }
}

pub struct FocusRestorationService {
    backend: Box<dyn ActivationBackend>,
}

impl Default for FocusRestorationService {
    fn default() -> Self {
        Self::new(Box::new(Win32ActivationBackend))
    }
}

impl FocusRestorationService {
    pub fn new(backend: Box<dyn ActivationBackend>) -> Self {
        Self { backend }
    }

    /// Try to hand OS activation to `target`. Returns whether the target was
    /// actually foreground afterwards. A `false` is final; retrying is the
    /// caller's decision.
    pub fn restore(&self, target: &WindowRef) -> bool {
        let backend = self.backend.as_ref();

        let Some(target_thread) = backend.window_thread(target.id) else {
            tracing::debug!(id = target.id, "restore target no longer exists");
            return false;
        };

        if backend.foreground_window() == Some(target.id) {
            return true;
        }

        let caller_thread = backend.current_thread();
        let requested = if caller_thread == target_thread {
            backend.activate(target.id)
        } else if backend.attach_input(caller_thread, target_thread) {
            let _guard = AttachGuard {
                backend,
                from_thread: caller_thread,
                to_thread: target_thread,
            };
            backend.raise(target.id);
            backend.activate(target.id)
        } else {
            // Weaker path: no shared input state, the OS may refuse silently.
            tracing::debug!(
                id = target.id,
                target_thread,
                "input attach refused, attempting direct activation"
            );
            backend.activate(target.id)
        };

        backend.settle();
        let landed = backend.foreground_window() == Some(target.id);
        if !(requested && landed) {
            tracing::debug!(
                id = target.id,
                requested,
                landed,
                "activation transfer did not take"
            );
        }
        requested && landed
    }
}

/// Production backend.
pub struct Win32ActivationBackend;

#[cfg(windows)]
impl ActivationBackend for Win32ActivationBackend {
    fn foreground_window(&self) -> Option<WindowId> {
        use windows::Win32::UI::WindowsAndMessaging::GetForegroundWindow;
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            None
        } else {
            Some(hwnd.0 as isize)
        }
    }

    fn current_thread(&self) -> u32 {
        use windows::Win32::System::Threading::GetCurrentThreadId;
        unsafe { GetCurrentThreadId() }
    }

    fn window_thread(&self, window: WindowId) -> Option<u32> {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::{GetWindowThreadProcessId, IsWindow};
        let hwnd = HWND(window as *mut core::ffi::c_void);
        unsafe {
            if !IsWindow(hwnd).as_bool() {
                return None;
            }
            let thread = GetWindowThreadProcessId(hwnd, None);
            (thread != 0).then_some(thread)
        }
    }

    fn attach_input(&self, from_thread: u32, to_thread: u32) -> bool {
        use windows::Win32::Foundation::BOOL;
        use windows::Win32::UI::Input::KeyboardAndMouse::AttachThreadInput;
        unsafe { AttachThreadInput(from_thread, to_thread, BOOL::from(true)).as_bool() }
    }

    fn detach_input(&self, from_thread: u32, to_thread: u32) {
        use windows::Win32::Foundation::BOOL;
        use windows::Win32::UI::Input::KeyboardAndMouse::AttachThreadInput;
        unsafe {
            let _ = AttachThreadInput(from_thread, to_thread, BOOL::from(false));
        }
    }

    fn raise(&self, window: WindowId) {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::BringWindowToTop;
        unsafe {
            let _ = BringWindowToTop(HWND(window as *mut core::ffi::c_void));
        }
    }

    fn activate(&self, window: WindowId) -> bool {
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::WindowsAndMessaging::SetForegroundWindow;
        unsafe { SetForegroundWindow(HWND(window as *mut core::ffi::c_void)).as_bool() }
    }

    fn settle(&self) {
        std::thread::sleep(SETTLE_DELAY);
    }
}

#[cfg(not(windows))]
impl ActivationBackend for Win32ActivationBackend {
    fn foreground_window(&self) -> Option<WindowId> {
        None
    }
    fn current_thread(&self) -> u32 {
        0
    }
    fn window_thread(&self, _window: WindowId) -> Option<u32> {
        None
    }
    fn attach_input(&self, _from_thread: u32, _to_thread: u32) -> bool {
        false
    }
    fn detach_input(&self, _from_thread: u32, _to_thread: u32) {}
    fn raise(&self, _window: WindowId) {}
    fn activate(&self, _window: WindowId) -> bool {
        false
    }
    fn settle(&self) {}
}

/// Scriptable backend for tests; records the protocol's call sequence.
pub struct MockActivationBackend {
    pub calls: std::sync::Mutex<Vec<String>>,
    pub foreground: std::sync::Mutex<Option<WindowId>>,
    pub foreground_after_activate: std::sync::Mutex<Option<WindowId>>,
    pub caller_thread: u32,
    pub window_threads: std::sync::Mutex<std::collections::HashMap<WindowId, u32>>,
    pub attach_succeeds: std::sync::atomic::AtomicBool,
    pub activate_succeeds: std::sync::atomic::AtomicBool,
}

impl Default for MockActivationBackend {
    fn default() -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            foreground: std::sync::Mutex::new(None),
            foreground_after_activate: std::sync::Mutex::new(None),
            caller_thread: 1,
            window_threads: std::sync::Mutex::new(std::collections::HashMap::new()),
            attach_succeeds: std::sync::atomic::AtomicBool::new(true),
            activate_succeeds: std::sync::atomic::AtomicBool::new(true),
        }
    }
}

impl MockActivationBackend {
    fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ActivationBackend for std::sync::Arc<MockActivationBackend> {
    fn foreground_window(&self) -> Option<WindowId> {
        self.foreground.lock().ok().and_then(|f| *f)
    }

    fn current_thread(&self) -> u32 {
        self.caller_thread
    }

    fn window_thread(&self, window: WindowId) -> Option<u32> {
        self.window_threads
            .lock()
            .ok()
            .and_then(|m| m.get(&window).copied())
    }

    fn attach_input(&self, from_thread: u32, to_thread: u32) -> bool {
        self.record(format!("attach {from_thread}->{to_thread}"));
        self.attach_succeeds.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn detach_input(&self, from_thread: u32, to_thread: u32) {
        self.record(format!("detach {from_thread}->{to_thread}"));
    }

    fn raise(&self, window: WindowId) {
        self.record(format!("raise {window}"));
    }

    fn activate(&self, window: WindowId) -> bool {
        self.record(format!("activate {window}"));
        let ok = self.activate_succeeds.load(std::sync::atomic::Ordering::SeqCst);
        if ok {
            if let (Ok(mut fg), Ok(after)) =
                (self.foreground.lock(), self.foreground_after_activate.lock())
            {
                if let Some(next) = *after {
                    *fg = Some(next);
                }
            }
        }
        ok
    }

    fn settle(&self) {
        self.record("settle".to_string());
    }
}
