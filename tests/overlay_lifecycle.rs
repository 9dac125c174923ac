//! Observer and coordinator wired together the way the app wires them.

use overkey::focus::observer::{
    FocusObserver, MockObserverBackend, NotificationKind, ObserverEvent, SELF_CHILD_ID,
    WINDOW_OBJECT_ID,
};
use overkey::focus::tracker::{TargetWindowTracker, WindowValidator};
use overkey::focus::window_ref::WindowRef;
use overkey::input::injector::{MockInputBackend, SyntheticInputInjector};
use overkey::visibility::{MockOverlayWindow, MockRestorer, OverlayState, VisibilityCoordinator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct FlagValidator(Arc<AtomicBool>);

impl WindowValidator for FlagValidator {
    fn is_alive(&self, _window: &WindowRef) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Fixture {
    observer: FocusObserver,
    coordinator: VisibilityCoordinator,
    restorer: Arc<MockRestorer>,
    alive: Arc<AtomicBool>,
}

fn fixture() -> Fixture {
    let alive = Arc::new(AtomicBool::new(true));
    let tracker = Arc::new(TargetWindowTracker::new(Box::new(FlagValidator(
        Arc::clone(&alive),
    ))));
    let observer =
        FocusObserver::new(Arc::clone(&tracker), Box::new(MockObserverBackend::default()));

    let restorer = Arc::new(MockRestorer::default());
    restorer.succeed.store(true, Ordering::SeqCst);
    let injector = Arc::new(SyntheticInputInjector::new(Box::new(Arc::new(
        MockInputBackend::default(),
    ))));
    let coordinator = VisibilityCoordinator::new(
        tracker,
        Box::new(Arc::clone(&restorer)),
        injector,
        Box::new(Arc::new(MockOverlayWindow::default())),
    );

    Fixture {
        observer,
        coordinator,
        restorer,
        alive,
    }
}

fn focus_edit_control(observer: &FocusObserver, id: isize, now: Instant) {
    observer.shared().handle_notification(
        NotificationKind::ObjectFocus,
        WindowRef::new(id, 2, 5, "Edit"),
        WINDOW_OBJECT_ID,
        SELF_CHILD_ID,
        true,
        now,
    );
}

#[test]
fn auto_show_event_drives_show_and_restoration() {
    let mut fx = fixture();
    let now = Instant::now();

    focus_edit_control(&fx.observer, 21, now);

    for event in fx.observer.drain_events() {
        match event {
            ObserverEvent::AutoShowRequested(_) => fx.coordinator.auto_show(now),
        }
    }
    assert_eq!(fx.coordinator.state(), OverlayState::Visible);

    fx.coordinator.poll(now + Duration::from_millis(100));
    let restored = fx.restorer.restored.lock().unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].id, 21);
}

#[test]
fn target_dying_before_show_skips_restoration() {
    let mut fx = fixture();
    let now = Instant::now();

    focus_edit_control(&fx.observer, 21, now);
    fx.alive.store(false, Ordering::SeqCst);

    // The snapshot taken at show time sees the stale target as "no target."
    fx.coordinator.show(now);
    fx.coordinator.poll(now + Duration::from_millis(100));

    assert_eq!(fx.coordinator.state(), OverlayState::Visible);
    assert!(fx.restorer.restored.lock().unwrap().is_empty());
}

#[test]
fn hide_then_refocus_within_cooldown_stays_hidden() {
    let mut fx = fixture();
    let now = Instant::now();

    focus_edit_control(&fx.observer, 21, now);
    fx.observer.drain_events();
    fx.coordinator.show(now);

    let hidden_at = now + Duration::from_millis(50);
    fx.coordinator.hide(hidden_at);
    fx.observer.note_hidden(hidden_at);

    // Hiding shifted focus back to the document; that refocus must not bounce
    // the overlay straight back up.
    focus_edit_control(&fx.observer, 21, hidden_at + Duration::from_millis(100));
    assert!(fx.observer.drain_events().is_empty());
    assert_eq!(fx.coordinator.state(), OverlayState::Hidden);
}
