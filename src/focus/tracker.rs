//! The single slot holding "where keystrokes should ultimately land."
//!
//! Written only by the focus observer's acceptance path, read by the show and
//! restoration logic, cleared on hide and shutdown. Reads re-validate the
//! window against the desktop; a handle that died since it was observed is
//! reported as "no target," never handed out.

use std::sync::Mutex;

use crate::focus::window_ref::WindowRef;

/// Validity seam so tracker behavior is testable without live windows.
pub trait WindowValidator: Send + Sync {
    fn is_alive(&self, window: &WindowRef) -> bool;
}

/// Production validator: asks the OS.
pub struct LiveWindowValidator;

impl WindowValidator for LiveWindowValidator {
    fn is_alive(&self, window: &WindowRef) -> bool {
        window.is_alive()
    }
}

pub struct TargetWindowTracker {
    slot: Mutex<Option<WindowRef>>,
    validator: Box<dyn WindowValidator>,
}

impl Default for TargetWindowTracker {
    fn default() -> Self {
        Self::new(Box::new(LiveWindowValidator))
    }
}

impl TargetWindowTracker {
    pub fn new(validator: Box<dyn WindowValidator>) -> Self {
        Self {
            slot: Mutex::new(None),
            validator,
        }
    }

    /// Store an accepted focus target. Callers have already run the filtering
    /// pipeline; this is just the slot update.
    pub fn set(&self, window: WindowRef) {
        if let Ok(mut guard) = self.slot.lock() {
            tracing::debug!(id = window.id, class = %window.class_name, "tracked target updated");
            *guard = Some(window);
        }
    }

    /// Current target, re-validated at call time. A stale entry is dropped and
    /// reported as `None`. Only the existence check runs under the lock.
    pub fn get(&self) -> Option<WindowRef> {
        let mut guard = self.slot.lock().ok()?;
        match guard.as_ref() {
            Some(window) if self.validator.is_alive(window) => Some(window.clone()),
            Some(window) => {
                tracing::debug!(
                    id = window.id,
                    seen_ms_ago = window.seen_at.elapsed().as_millis() as u64,
                    "tracked target went stale, clearing"
                );
                *guard = None;
                None
            }
            None => None,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FlagValidator(Arc<AtomicBool>);

    impl WindowValidator for FlagValidator {
        fn is_alive(&self, _window: &WindowRef) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn window(id: isize) -> WindowRef {
        WindowRef::new(id, 7, 11, "Notepad")
    }

    #[test]
    fn get_returns_live_target() {
        let alive = Arc::new(AtomicBool::new(true));
        let tracker = TargetWindowTracker::new(Box::new(FlagValidator(Arc::clone(&alive))));
        tracker.set(window(42));
        assert_eq!(tracker.get().map(|w| w.id), Some(42));
    }

    #[test]
    fn stale_target_surfaces_as_none_and_clears() {
        let alive = Arc::new(AtomicBool::new(true));
        let tracker = TargetWindowTracker::new(Box::new(FlagValidator(Arc::clone(&alive))));
        tracker.set(window(42));

        alive.store(false, Ordering::SeqCst);
        assert!(tracker.get().is_none());

        // Even after the window "comes back," the stale entry is gone.
        alive.store(true, Ordering::SeqCst);
        assert!(tracker.get().is_none());
    }

    #[test]
    fn clear_empties_the_slot() {
        let alive = Arc::new(AtomicBool::new(true));
        let tracker = TargetWindowTracker::new(Box::new(FlagValidator(alive)));
        tracker.set(window(1));
        tracker.clear();
        assert!(tracker.get().is_none());
    }
}
