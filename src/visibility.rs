//! Show/hide orchestration.
//!
//! The coordinator owns the overlay's lifecycle state machine. Showing and
//! focus restoration are independent outcomes: the overlay always becomes
//! visible, and a restoration attempt is scheduled to run after a short grace
//! period, succeeding or failing on its own. Hiding releases every latched
//! modifier and clears the tracked target so nothing stale survives into the
//! next show.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::focus::observer::cooldown_elapsed;
use crate::focus::restore::FocusRestorationService;
use crate::focus::tracker::TargetWindowTracker;
use crate::focus::window_ref::WindowRef;
use crate::input::injector::SyntheticInputInjector;
use crate::input::modifiers::ModifierLatchSet;
use crate::keymap::Latch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Showing,
    Visible,
    Hiding,
    Terminated,
}

/// The window operations the coordinator drives; the production impl talks to
/// the real overlay window, tests record calls.
pub trait OverlayWindow: Send {
    fn position_for_typing(&self);
    fn show_without_activation(&self);
    fn hide(&self);
}

/// Restoration seam so the state machine is testable without a desktop.
pub trait TargetRestorer: Send {
    fn restore(&self, target: &WindowRef) -> bool;
}

impl TargetRestorer for FocusRestorationService {
    fn restore(&self, target: &WindowRef) -> bool {
        FocusRestorationService::restore(self, target)
    }
}

struct PendingRestore {
    due: Instant,
    target: Option<WindowRef>,
}

pub struct VisibilityCoordinator {
    state: OverlayState,
    tracker: Arc<TargetWindowTracker>,
    restorer: Box<dyn TargetRestorer>,
    injector: Arc<SyntheticInputInjector>,
    latches: ModifierLatchSet,
    window: Box<dyn OverlayWindow>,
    restore_grace: Duration,
    cooldown: Duration,
    last_hide: Option<Instant>,
    pending_restore: Option<PendingRestore>,
}

impl VisibilityCoordinator {
    pub fn new(
        tracker: Arc<TargetWindowTracker>,
        restorer: Box<dyn TargetRestorer>,
        injector: Arc<SyntheticInputInjector>,
        window: Box<dyn OverlayWindow>,
    ) -> Self {
        Self {
            state: OverlayState::Hidden,
            tracker,
            restorer,
            injector,
            latches: ModifierLatchSet::default(),
            window,
            restore_grace: Duration::from_millis(80),
            cooldown: Duration::from_millis(500),
            last_hide: None,
            pending_restore: None,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    pub fn show(&mut self, now: Instant) {
        if self.state != OverlayState::Hidden {
            return;
        }
        self.state = OverlayState::Showing;

        // Snapshot before the overlay appears; the act of showing can itself
        // produce focus churn.
        let target = self.tracker.get();
        self.window.position_for_typing();
        self.window.show_without_activation();
        self.pending_restore = Some(PendingRestore {
            due: now + self.restore_grace,
            target,
        });

        self.state = OverlayState::Visible;
        tracing::info!("overlay shown");
    }

    pub fn hide(&mut self, now: Instant) {
        if self.state != OverlayState::Visible {
            return;
        }
        self.state = OverlayState::Hiding;

        self.latches.release_all(&self.injector);
        self.tracker.clear();
        self.pending_restore = None;
        self.window.hide();
        self.last_hide = Some(now);

        self.state = OverlayState::Hidden;
        tracing::info!("overlay hidden");
    }

    pub fn toggle(&mut self, now: Instant) {
        match self.state {
            OverlayState::Hidden => self.show(now),
            OverlayState::Visible => self.hide(now),
            _ => {}
        }
    }

    /// Observer-triggered show. Applies only from HIDDEN and honors the
    /// cooldown after a hide; it never forces a hide.
    pub fn auto_show(&mut self, now: Instant) {
        if self.state != OverlayState::Hidden {
            return;
        }
        if !cooldown_elapsed(self.last_hide, self.cooldown, now) {
            tracing::debug!("auto-show suppressed by cooldown");
            return;
        }
        self.show(now);
    }

    /// Drive scheduled work; call once per UI frame. Runs the restoration
    /// attempt once its grace delay has passed.
    pub fn poll(&mut self, now: Instant) {
        let due = self
            .pending_restore
            .as_ref()
            .is_some_and(|pending| now >= pending.due);
        if !due {
            return;
        }
        let Some(pending) = self.pending_restore.take() else {
            return;
        };
        match pending.target {
            Some(target) => {
                let restored = self.restorer.restore(&target);
                if !restored {
                    tracing::info!(id = target.id, "focus restoration did not succeed");
                }
            }
            None => {
                tracing::info!("no tracked target, restoration skipped");
            }
        }
    }

    pub fn toggle_latch(&mut self, latch: Latch) -> bool {
        self.latches.toggle(latch, &self.injector)
    }

    pub fn latch_held(&self, latch: Latch) -> bool {
        self.latches.is_held(latch)
    }

    /// Terminal transition: release anything held, drop the target, stop.
    pub fn shutdown(&mut self) {
        if self.state == OverlayState::Terminated {
            return;
        }
        self.latches.release_all(&self.injector);
        self.tracker.clear();
        self.pending_restore = None;
        self.state = OverlayState::Terminated;
        tracing::info!("overlay coordinator shut down");
    }
}

/// Recording window for tests.
#[derive(Default)]
pub struct MockOverlayWindow {
    pub calls: std::sync::Mutex<Vec<&'static str>>,
}

impl MockOverlayWindow {
    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl OverlayWindow for Arc<MockOverlayWindow> {
    fn position_for_typing(&self) {
        self.record("position");
    }

    fn show_without_activation(&self) {
        self.record("show");
    }

    fn hide(&self) {
        self.record("hide");
    }
}

/// Recording restorer for tests.
#[derive(Default)]
pub struct MockRestorer {
    pub restored: std::sync::Mutex<Vec<WindowRef>>,
    pub succeed: std::sync::atomic::AtomicBool,
}

impl TargetRestorer for Arc<MockRestorer> {
    fn restore(&self, target: &WindowRef) -> bool {
        if let Ok(mut restored) = self.restored.lock() {
            restored.push(target.clone());
        }
        self.succeed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::tracker::WindowValidator;
    use crate::input::injector::MockInputBackend;

    struct AlwaysAlive;

    impl WindowValidator for AlwaysAlive {
        fn is_alive(&self, _window: &WindowRef) -> bool {
            true
        }
    }

    fn fixture() -> (
        VisibilityCoordinator,
        Arc<TargetWindowTracker>,
        Arc<MockRestorer>,
        Arc<MockOverlayWindow>,
        Arc<MockInputBackend>,
    ) {
        let tracker = Arc::new(TargetWindowTracker::new(Box::new(AlwaysAlive)));
        let restorer = Arc::new(MockRestorer::default());
        restorer
            .succeed
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let backend = Arc::new(MockInputBackend::default());
        let injector = Arc::new(SyntheticInputInjector::new(Box::new(Arc::clone(&backend))));
        let window = Arc::new(MockOverlayWindow::default());
        let coordinator = VisibilityCoordinator::new(
            Arc::clone(&tracker),
            Box::new(Arc::clone(&restorer)),
            injector,
            Box::new(Arc::clone(&window)),
        );
        (coordinator, tracker, restorer, window, backend)
    }

    fn target(id: isize) -> WindowRef {
        WindowRef::new(id, 3, 9, "Notepad")
    }

    #[test]
    fn show_positions_then_shows_then_restores_after_grace() {
        let (mut coordinator, tracker, restorer, window, _) = fixture();
        tracker.set(target(10));

        let now = Instant::now();
        coordinator.show(now);
        assert_eq!(coordinator.state(), OverlayState::Visible);
        assert_eq!(window.call_log(), vec!["position", "show"]);

        // Before the grace delay nothing restores.
        coordinator.poll(now);
        assert!(restorer.restored.lock().unwrap().is_empty());

        coordinator.poll(now + Duration::from_millis(100));
        assert_eq!(restorer.restored.lock().unwrap().len(), 1);

        // One attempt only; nothing re-fires.
        coordinator.poll(now + Duration::from_millis(200));
        assert_eq!(restorer.restored.lock().unwrap().len(), 1);
    }

    #[test]
    fn show_without_target_skips_restoration() {
        let (mut coordinator, _, restorer, window, _) = fixture();

        let now = Instant::now();
        coordinator.show(now);
        coordinator.poll(now + Duration::from_millis(100));

        assert_eq!(coordinator.state(), OverlayState::Visible);
        assert_eq!(window.call_log(), vec!["position", "show"]);
        assert!(restorer.restored.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_restoration_still_leaves_overlay_visible() {
        let (mut coordinator, tracker, restorer, _, _) = fixture();
        restorer
            .succeed
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracker.set(target(10));

        let now = Instant::now();
        coordinator.show(now);
        coordinator.poll(now + Duration::from_millis(100));
        assert_eq!(coordinator.state(), OverlayState::Visible);
    }

    #[test]
    fn hide_releases_latches_and_clears_target() {
        let (mut coordinator, tracker, _, window, backend) = fixture();
        tracker.set(target(10));

        let now = Instant::now();
        coordinator.show(now);
        coordinator.toggle_latch(Latch::Shift);
        coordinator.toggle_latch(Latch::Ctrl);
        let before_hide = backend.recorded().len();

        coordinator.hide(now + Duration::from_millis(10));
        assert_eq!(coordinator.state(), OverlayState::Hidden);
        assert!(tracker.get().is_none());
        assert!(window.call_log().contains(&"hide"));

        // One key-up per held latch.
        let released = backend.recorded().len() - before_hide;
        assert_eq!(released, 2);
        assert!(!coordinator.latch_held(Latch::Shift));
        assert!(!coordinator.latch_held(Latch::Ctrl));
    }

    #[test]
    fn toggle_cycles_between_hidden_and_visible() {
        let (mut coordinator, _, _, _, _) = fixture();
        let now = Instant::now();

        coordinator.toggle(now);
        assert_eq!(coordinator.state(), OverlayState::Visible);
        coordinator.toggle(now + Duration::from_millis(1));
        assert_eq!(coordinator.state(), OverlayState::Hidden);
    }

    #[test]
    fn auto_show_honors_cooldown_boundary() {
        let (mut coordinator, _, _, _, _) = fixture();
        let now = Instant::now();

        coordinator.show(now);
        coordinator.hide(now + Duration::from_millis(10));
        let hidden_at = now + Duration::from_millis(10);

        coordinator.auto_show(hidden_at + Duration::from_millis(499));
        assert_eq!(coordinator.state(), OverlayState::Hidden);

        coordinator.auto_show(hidden_at + Duration::from_millis(501));
        assert_eq!(coordinator.state(), OverlayState::Visible);
    }

    #[test]
    fn auto_show_never_hides_a_visible_overlay() {
        let (mut coordinator, _, _, _, _) = fixture();
        let now = Instant::now();
        coordinator.show(now);
        coordinator.auto_show(now + Duration::from_secs(10));
        assert_eq!(coordinator.state(), OverlayState::Visible);
    }

    #[test]
    fn shutdown_is_terminal_from_any_state() {
        let (mut coordinator, tracker, _, _, _) = fixture();
        tracker.set(target(10));
        coordinator.show(Instant::now());

        coordinator.shutdown();
        assert_eq!(coordinator.state(), OverlayState::Terminated);
        assert!(tracker.get().is_none());

        // Nothing revives it.
        coordinator.toggle(Instant::now());
        assert_eq!(coordinator.state(), OverlayState::Terminated);
    }
}
