//! System-wide focus observation.
//!
//! One service instance owns both notification sources: the WinEvent
//! focus/foreground subscription and the low-level mouse hook. Both are
//! installed from a dedicated thread that runs the message pump their
//! callbacks are delivered on, and both are removed exactly once when the
//! service shuts down. Nothing may panic or return an error across the OS
//! callback boundary; callbacks convert every failure into a log line.

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::input::classifier::InputOrigin;
use crate::focus::tracker::TargetWindowTracker;
use crate::focus::window_ref::{is_shell_class, WindowId, WindowRef};

/// Object/child ids that designate the window itself rather than a
/// sub-element.
pub const WINDOW_OBJECT_ID: i32 = 0;
pub const SELF_CHILD_ID: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ObjectFocus,
    ForegroundChanged,
}

/// One observed pointer-button press, most recent only.
#[derive(Debug, Clone, Copy)]
pub struct ClickSample {
    pub when: Instant,
    pub screen_point: (i32, i32),
    pub origin: InputOrigin,
    pub raw_extra: usize,
}

/// Events crossing from the hook thread to the UI thread.
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    /// An editable control took focus while auto-show was armed.
    AutoShowRequested(WindowRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accept,
    Reject(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    SubElement,
    OverlayItself,
    NotVisible,
    ShellSurface,
}

/// The acceptance pipeline for one focus notification, applied in order with
/// the first match winning.
pub fn filter_notification(
    object_id: i32,
    child_id: i32,
    window: WindowId,
    overlay_window: Option<WindowId>,
    visible: bool,
    class_name: &str,
) -> FilterVerdict {
    if object_id != WINDOW_OBJECT_ID || child_id != SELF_CHILD_ID {
        return FilterVerdict::Reject(RejectReason::SubElement);
    }
    if Some(window) == overlay_window {
        return FilterVerdict::Reject(RejectReason::OverlayItself);
    }
    if !visible {
        return FilterVerdict::Reject(RejectReason::NotVisible);
    }
    if is_shell_class(class_name) {
        return FilterVerdict::Reject(RejectReason::ShellSurface);
    }
    FilterVerdict::Accept
}

/// Time-based suppression after a hide; no hide on record means no
/// suppression.
pub fn cooldown_elapsed(last_hide: Option<Instant>, cooldown: Duration, now: Instant) -> bool {
    match last_hide {
        Some(hidden_at) => now.duration_since(hidden_at) > cooldown,
        None => true,
    }
}

/// State shared between the service handle, the hook callbacks, and the
/// visibility logic.
pub struct ObserverShared {
    pub tracker: Arc<TargetWindowTracker>,
    auto_show_enabled: AtomicBool,
    cooldown_ms: AtomicU64,
    last_hide: Mutex<Option<Instant>>,
    overlay_window: AtomicIsize,
    sender: Mutex<Option<Sender<ObserverEvent>>>,
    last_click: Mutex<Option<ClickSample>>,
}

impl ObserverShared {
    fn new(tracker: Arc<TargetWindowTracker>) -> Self {
        Self {
            tracker,
            auto_show_enabled: AtomicBool::new(true),
            cooldown_ms: AtomicU64::new(500),
            last_hide: Mutex::new(None),
            overlay_window: AtomicIsize::new(0),
            sender: Mutex::new(None),
            last_click: Mutex::new(None),
        }
    }

    pub fn overlay_window(&self) -> Option<WindowId> {
        match self.overlay_window.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    fn auto_show_armed(&self, now: Instant) -> bool {
        if !self.auto_show_enabled.load(Ordering::Acquire) {
            return false;
        }
        let last_hide = self.last_hide.lock().ok().and_then(|g| *g);
        let cooldown = Duration::from_millis(self.cooldown_ms.load(Ordering::Acquire));
        cooldown_elapsed(last_hide, cooldown, now)
    }

    fn send(&self, event: ObserverEvent) {
        if let Ok(guard) = self.sender.lock() {
            if let Some(sender) = guard.as_ref() {
                let _ = sender.send(event);
            }
        }
    }

    fn record_click(&self, sample: ClickSample) {
        if let Ok(mut guard) = self.last_click.lock() {
            *guard = Some(sample);
        }
    }

    /// Full handling of one focus/foreground notification. Runs on the hook
    /// thread; also driven directly by tests.
    pub fn handle_notification(
        &self,
        kind: NotificationKind,
        window: WindowRef,
        object_id: i32,
        child_id: i32,
        visible: bool,
        now: Instant,
    ) {
        let verdict = filter_notification(
            object_id,
            child_id,
            window.id,
            self.overlay_window(),
            visible,
            &window.class_name,
        );
        match verdict {
            FilterVerdict::Reject(reason) => {
                tracing::trace!(?kind, ?reason, id = window.id, "focus notification rejected");
            }
            FilterVerdict::Accept => {
                self.tracker.set(window.clone());
                if self.auto_show_armed(now)
                    && crate::focus::probe::is_editable_target(&window, object_id, child_id)
                {
                    self.send(ObserverEvent::AutoShowRequested(window));
                }
            }
        }
    }
}

/// Platform seam: installs and removes the two hooks.
pub trait ObserverBackend: Send {
    fn install(&mut self, shared: Arc<ObserverShared>) -> Result<()>;
    fn uninstall(&mut self) -> Result<()>;
    fn is_installed(&self) -> bool;
}

pub struct FocusObserver {
    shared: Arc<ObserverShared>,
    backend: Box<dyn ObserverBackend>,
    receiver: Receiver<ObserverEvent>,
    installed: bool,
}

impl FocusObserver {
    pub fn new(tracker: Arc<TargetWindowTracker>, backend: Box<dyn ObserverBackend>) -> Self {
        let shared = Arc::new(ObserverShared::new(tracker));
        let (sender, receiver) = std::sync::mpsc::channel();
        if let Ok(mut guard) = shared.sender.lock() {
            *guard = Some(sender);
        }
        Self {
            shared,
            backend,
            receiver,
            installed: false,
        }
    }

    #[cfg(windows)]
    pub fn with_default_backend(tracker: Arc<TargetWindowTracker>) -> Self {
        Self::new(tracker, Box::new(platform::WinHookBackend::default()))
    }

    #[cfg(not(windows))]
    pub fn with_default_backend(tracker: Arc<TargetWindowTracker>) -> Self {
        Self::new(tracker, Box::new(UnsupportedBackend))
    }

    pub fn install(&mut self) -> Result<()> {
        if self.installed {
            return Ok(());
        }
        self.backend.install(Arc::clone(&self.shared))?;
        self.installed = true;
        Ok(())
    }

    pub fn uninstall(&mut self) {
        if !self.installed {
            return;
        }
        if let Err(err) = self.backend.uninstall() {
            tracing::warn!(?err, "failed to remove focus hooks");
        }
        self.installed = false;
    }

    pub fn is_installed(&self) -> bool {
        self.installed && self.backend.is_installed()
    }

    /// Events queued by the hook thread since the last drain.
    pub fn drain_events(&self) -> Vec<ObserverEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn last_click(&self) -> Option<ClickSample> {
        self.shared.last_click.lock().ok().and_then(|g| *g)
    }

    pub fn shared(&self) -> &Arc<ObserverShared> {
        &self.shared
    }

    /// The overlay's own window, once known, so the pipeline can reject it.
    pub fn set_overlay_window(&self, id: WindowId) {
        self.shared.overlay_window.store(id, Ordering::Release);
    }

    pub fn set_auto_show(&self, enabled: bool) {
        self.shared.auto_show_enabled.store(enabled, Ordering::Release);
    }

    pub fn set_cooldown(&self, cooldown: Duration) {
        self.shared
            .cooldown_ms
            .store(cooldown.as_millis() as u64, Ordering::Release);
    }

    /// Called when the overlay hides; starts the auto-show cooldown window.
    pub fn note_hidden(&self, now: Instant) {
        if let Ok(mut guard) = self.shared.last_hide.lock() {
            *guard = Some(now);
        }
    }
}

impl Drop for FocusObserver {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Backend for builds without hook support; install fails and the overlay
/// stays in manual-show mode.
pub struct UnsupportedBackend;

impl ObserverBackend for UnsupportedBackend {
    fn install(&mut self, _shared: Arc<ObserverShared>) -> Result<()> {
        anyhow::bail!("focus hooks are not supported on this platform")
    }

    fn uninstall(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}

/// Test backend recording install/uninstall pairing.
#[derive(Default)]
pub struct MockObserverBackend {
    pub installs: usize,
    pub uninstalls: usize,
    pub shared: Option<Arc<ObserverShared>>,
}

impl ObserverBackend for MockObserverBackend {
    fn install(&mut self, shared: Arc<ObserverShared>) -> Result<()> {
        self.installs += 1;
        self.shared = Some(shared);
        Ok(())
    }

    fn uninstall(&mut self) -> Result<()> {
        self.uninstalls += 1;
        self.shared = None;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.shared.is_some()
    }
}

#[cfg(windows)]
mod platform {
    //! The real hooks. Both are installed from one thread that then pumps
    //! messages until shutdown posts `WM_QUIT`; unhooking happens on that same
    //! thread before it exits, so install and removal are strictly paired
    //! with the thread's lifetime.

    use super::*;
    use anyhow::anyhow;
    use once_cell::sync::OnceCell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::thread::JoinHandle;

    use crate::input::classifier::{classify, MessageSource, SourceOrigin};

    /// The callbacks are free functions, so the one live service publishes its
    /// shared state here for them to find.
    static ACTIVE: OnceCell<Mutex<Option<Arc<ObserverShared>>>> = OnceCell::new();

    fn active_slot() -> &'static Mutex<Option<Arc<ObserverShared>>> {
        ACTIVE.get_or_init(|| Mutex::new(None))
    }

    fn active_shared() -> Option<Arc<ObserverShared>> {
        active_slot().lock().ok().and_then(|guard| guard.clone())
    }

    struct HookThread {
        thread_id: u32,
        join: JoinHandle<()>,
    }

    #[derive(Default)]
    pub struct WinHookBackend {
        hook_thread: Option<HookThread>,
    }

    impl ObserverBackend for WinHookBackend {
        fn install(&mut self, shared: Arc<ObserverShared>) -> Result<()> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            if let Ok(mut guard) = active_slot().lock() {
                *guard = Some(shared);
            }

            use windows::Win32::Foundation::HMODULE;
            use windows::Win32::System::Com::{
                CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED,
            };
            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent};
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
                UnhookWindowsHookEx, EVENT_OBJECT_FOCUS, EVENT_SYSTEM_FOREGROUND, MSG,
                PM_NOREMOVE, WH_MOUSE_LL, WINEVENT_OUTOFCONTEXT,
            };

            // Handshake so install() only returns once the hooks are live.
            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<u32>>(1);

            let join = std::thread::spawn(move || {
                // Ensure the thread has a message queue before hooking.
                let mut msg = MSG::default();
                unsafe {
                    let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                }

                let thread_id = unsafe { GetCurrentThreadId() };
                let com = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };

                let focus_hook = unsafe {
                    SetWinEventHook(
                        EVENT_OBJECT_FOCUS,
                        EVENT_OBJECT_FOCUS,
                        HMODULE(std::ptr::null_mut()),
                        Some(win_event_proc),
                        0,
                        0,
                        WINEVENT_OUTOFCONTEXT,
                    )
                };
                if focus_hook.0.is_null() {
                    let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                    if com.is_ok() {
                        unsafe { CoUninitialize() };
                    }
                    return;
                }

                let foreground_hook = unsafe {
                    SetWinEventHook(
                        EVENT_SYSTEM_FOREGROUND,
                        EVENT_SYSTEM_FOREGROUND,
                        HMODULE(std::ptr::null_mut()),
                        Some(win_event_proc),
                        0,
                        0,
                        WINEVENT_OUTOFCONTEXT,
                    )
                };
                if foreground_hook.0.is_null() {
                    let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                    unsafe {
                        let _ = UnhookWinEvent(focus_hook);
                        if com.is_ok() {
                            CoUninitialize();
                        }
                    }
                    return;
                }

                let hmodule = match unsafe { GetModuleHandleW(None) } {
                    Ok(h) => h,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow!(err)));
                        unsafe {
                            let _ = UnhookWinEvent(focus_hook);
                            let _ = UnhookWinEvent(foreground_hook);
                            if com.is_ok() {
                                CoUninitialize();
                            }
                        }
                        return;
                    }
                };

                let mouse_hook = match unsafe {
                    SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
                } {
                    Ok(h) if !h.0.is_null() => h,
                    Ok(_) => {
                        let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                        unsafe {
                            let _ = UnhookWinEvent(focus_hook);
                            let _ = UnhookWinEvent(foreground_hook);
                            if com.is_ok() {
                                CoUninitialize();
                            }
                        }
                        return;
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow!(err)));
                        unsafe {
                            let _ = UnhookWinEvent(focus_hook);
                            let _ = UnhookWinEvent(foreground_hook);
                            if com.is_ok() {
                                CoUninitialize();
                            }
                        }
                        return;
                    }
                };

                let _ = ready_tx.send(Ok(thread_id));

                loop {
                    let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                    if r.0 <= 0 {
                        break;
                    }
                    unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }

                unsafe {
                    let _ = UnhookWinEvent(focus_hook);
                    let _ = UnhookWinEvent(foreground_hook);
                    let _ = UnhookWindowsHookEx(mouse_hook);
                    if com.is_ok() {
                        CoUninitialize();
                    }
                }
            });

            let thread_id = match ready_rx
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| anyhow!("focus hook thread did not signal readiness"))
                .and_then(|r| r)
            {
                Ok(id) => id,
                Err(err) => {
                    if let Ok(mut guard) = active_slot().lock() {
                        *guard = None;
                    }
                    return Err(err);
                }
            };

            self.hook_thread = Some(HookThread { thread_id, join });
            Ok(())
        }

        fn uninstall(&mut self) -> Result<()> {
            if let Ok(mut guard) = active_slot().lock() {
                *guard = None;
            }

            if let Some(th) = self.hook_thread.take() {
                use windows::Win32::Foundation::{LPARAM, WPARAM};
                use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
                unsafe {
                    let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                let _ = th.join.join();
            }
            Ok(())
        }

        fn is_installed(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    unsafe extern "system" fn win_event_proc(
        _hook: windows::Win32::UI::Accessibility::HWINEVENTHOOK,
        event: u32,
        hwnd: windows::Win32::Foundation::HWND,
        id_object: i32,
        id_child: i32,
        _id_event_thread: u32,
        _time: u32,
    ) {
        use windows::Win32::UI::WindowsAndMessaging::{
            EVENT_OBJECT_FOCUS, EVENT_SYSTEM_FOREGROUND,
        };

        let result = catch_unwind(AssertUnwindSafe(|| {
            let kind = if event == EVENT_SYSTEM_FOREGROUND {
                NotificationKind::ForegroundChanged
            } else if event == EVENT_OBJECT_FOCUS {
                NotificationKind::ObjectFocus
            } else {
                return;
            };
            let Some(shared) = active_shared() else {
                return;
            };
            if hwnd.0.is_null() {
                return;
            }
            let Some(window) = WindowRef::capture(hwnd.0 as isize) else {
                return;
            };
            let visible = window.is_alive();
            shared.handle_notification(kind, window, id_object, id_child, visible, Instant::now());
        }));
        if result.is_err() {
            tracing::error!("panic contained in focus event callback");
        }
    }

    unsafe extern "system" fn mouse_hook_proc(
        n_code: i32,
        w_param: windows::Win32::Foundation::WPARAM,
        l_param: windows::Win32::Foundation::LPARAM,
    ) -> windows::Win32::Foundation::LRESULT {
        use windows::Win32::UI::WindowsAndMessaging::{
            CallNextHookEx, HC_ACTION, HHOOK, MSLLHOOKSTRUCT, WM_LBUTTONDOWN,
        };

        if n_code == HC_ACTION as i32 && w_param.0 as u32 == WM_LBUTTONDOWN {
            let result = catch_unwind(AssertUnwindSafe(|| {
                let info = unsafe { &*(l_param.0 as *const MSLLHOOKSTRUCT) };
                if let Some(shared) = active_shared() {
                    let origin =
                        classify(query_message_source(), info.flags, info.dwExtraInfo);
                    shared.record_click(ClickSample {
                        when: Instant::now(),
                        screen_point: (info.pt.x, info.pt.y),
                        origin,
                        raw_extra: info.dwExtraInfo,
                    });
                }
            }));
            if result.is_err() {
                tracing::error!("panic contained in mouse hook callback");
            }
        }

        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }

    /// Snapshot the input-message-source query for the event being handled.
    /// Outside a message dispatch the query fails; that maps to `None` and the
    /// classifier falls back to its heuristic.
    fn query_message_source() -> Option<MessageSource> {
        use windows::Win32::UI::WindowsAndMessaging::{
            GetCurrentInputMessageSource, IMDT_UNAVAILABLE, IMO_HARDWARE, IMO_INJECTED,
            IMO_SYSTEM, INPUT_MESSAGE_SOURCE,
        };

        let mut source = INPUT_MESSAGE_SOURCE::default();
        unsafe { GetCurrentInputMessageSource(&mut source) }.ok()?;

        let origin = if source.originId == IMO_HARDWARE {
            SourceOrigin::Hardware
        } else if source.originId == IMO_INJECTED {
            SourceOrigin::Injected
        } else if source.originId == IMO_SYSTEM {
            SourceOrigin::System
        } else {
            SourceOrigin::Unavailable
        };

        Some(MessageSource {
            device_known: source.deviceType != IMDT_UNAVAILABLE,
            origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept_args() -> (i32, i32, WindowId, Option<WindowId>, bool, &'static str) {
        (
            WINDOW_OBJECT_ID,
            SELF_CHILD_ID,
            100,
            Some(999),
            true,
            "Notepad",
        )
    }

    #[test]
    fn clean_notification_is_accepted() {
        let (obj, child, win, overlay, visible, class) = accept_args();
        assert_eq!(
            filter_notification(obj, child, win, overlay, visible, class),
            FilterVerdict::Accept
        );
    }

    #[test]
    fn sub_element_focus_is_rejected_first() {
        // Even a notification that would fail every later step reports the
        // sub-element rejection, proving the ordering.
        assert_eq!(
            filter_notification(4, 2, 999, Some(999), false, "Shell_TrayWnd"),
            FilterVerdict::Reject(RejectReason::SubElement)
        );
    }

    #[test]
    fn overlay_window_is_rejected() {
        assert_eq!(
            filter_notification(WINDOW_OBJECT_ID, SELF_CHILD_ID, 999, Some(999), true, "Notepad"),
            FilterVerdict::Reject(RejectReason::OverlayItself)
        );
    }

    #[test]
    fn invisible_window_is_rejected() {
        assert_eq!(
            filter_notification(WINDOW_OBJECT_ID, SELF_CHILD_ID, 5, Some(999), false, "Notepad"),
            FilterVerdict::Reject(RejectReason::NotVisible)
        );
    }

    #[test]
    fn shell_surface_is_rejected() {
        assert_eq!(
            filter_notification(
                WINDOW_OBJECT_ID,
                SELF_CHILD_ID,
                5,
                Some(999),
                true,
                "Shell_TrayWnd"
            ),
            FilterVerdict::Reject(RejectReason::ShellSurface)
        );
    }

    #[test]
    fn cooldown_boundaries() {
        let hidden_at = Instant::now();
        let cooldown = Duration::from_millis(500);
        assert!(!cooldown_elapsed(
            Some(hidden_at),
            cooldown,
            hidden_at + Duration::from_millis(499)
        ));
        assert!(cooldown_elapsed(
            Some(hidden_at),
            cooldown,
            hidden_at + Duration::from_millis(501)
        ));
        assert!(cooldown_elapsed(None, cooldown, hidden_at));
    }

    #[test]
    fn shell_notification_leaves_tracker_unchanged() {
        let tracker = Arc::new(TargetWindowTracker::new(Box::new(AlwaysAlive)));
        let shared = ObserverShared::new(Arc::clone(&tracker));

        let prior = WindowRef::new(42, 1, 1, "Notepad");
        tracker.set(prior.clone());

        let shell = WindowRef::new(7, 2, 2, "Shell_TrayWnd");
        shared.handle_notification(
            NotificationKind::ObjectFocus,
            shell,
            WINDOW_OBJECT_ID,
            SELF_CHILD_ID,
            true,
            Instant::now(),
        );

        assert_eq!(tracker.get(), Some(prior));
    }

    #[test]
    fn accepted_notification_updates_tracker() {
        let tracker = Arc::new(TargetWindowTracker::new(Box::new(AlwaysAlive)));
        let shared = ObserverShared::new(Arc::clone(&tracker));

        let window = WindowRef::new(42, 1, 1, "Notepad");
        shared.handle_notification(
            NotificationKind::ForegroundChanged,
            window.clone(),
            WINDOW_OBJECT_ID,
            SELF_CHILD_ID,
            true,
            Instant::now(),
        );

        assert_eq!(tracker.get(), Some(window));
    }

    #[test]
    fn install_and_uninstall_are_paired() {
        let tracker = Arc::new(TargetWindowTracker::new(Box::new(AlwaysAlive)));
        let mut observer = FocusObserver::new(tracker, Box::new(MockObserverBackend::default()));

        observer.install().expect("mock install succeeds");
        assert!(observer.is_installed());
        // A second install is a no-op, not a double hook.
        observer.install().expect("reinstall is a no-op");

        observer.uninstall();
        assert!(!observer.is_installed());
        observer.uninstall();
    }

    struct AlwaysAlive;

    impl crate::focus::tracker::WindowValidator for AlwaysAlive {
        fn is_alive(&self, _window: &WindowRef) -> bool {
            true
        }
    }
}
