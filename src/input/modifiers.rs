//! Sticky modifier latches driven by on-screen buttons.
//!
//! A latch toggled on holds its key logically down across any number of other
//! injected events; the matching release is caller-controlled. Before the
//! overlay hides, every held latch must be released so the target application
//! is not left with a phantom modifier.

use crate::input::injector::SyntheticInputInjector;
use crate::keymap::Latch;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierLatchSet {
    shift: bool,
    ctrl: bool,
    alt: bool,
    caps_lock: bool,
}

impl ModifierLatchSet {
    pub fn is_held(&self, latch: Latch) -> bool {
        match latch {
            Latch::Shift => self.shift,
            Latch::Ctrl => self.ctrl,
            Latch::Alt => self.alt,
            Latch::CapsLock => self.caps_lock,
        }
    }

    fn set(&mut self, latch: Latch, held: bool) {
        match latch {
            Latch::Shift => self.shift = held,
            Latch::Ctrl => self.ctrl = held,
            Latch::Alt => self.alt = held,
            Latch::CapsLock => self.caps_lock = held,
        }
    }

    /// Flip a latch, emitting the single key event that matches its new
    /// logical state: down when latching, up when unlatching.
    pub fn toggle(&mut self, latch: Latch, injector: &SyntheticInputInjector) -> bool {
        let now_held = !self.is_held(latch);
        let sent = if now_held {
            injector.key_down(latch.virtual_key())
        } else {
            injector.key_up(latch.virtual_key())
        };
        if sent {
            self.set(latch, now_held);
        } else {
            tracing::warn!(?latch, "latch toggle not applied, injection failed");
        }
        now_held && sent
    }

    /// Release every held latch. Each emits only the key-up half; the down was
    /// already sent when the latch engaged.
    pub fn release_all(&mut self, injector: &SyntheticInputInjector) {
        for latch in [Latch::Shift, Latch::Ctrl, Latch::Alt, Latch::CapsLock] {
            if self.is_held(latch) {
                if !injector.key_up(latch.virtual_key()) {
                    tracing::warn!(?latch, "latch release injection failed");
                }
                self.set(latch, false);
            }
        }
    }

    pub fn any_held(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.caps_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::injector::{KeyDirection, KeySlot, MockInputBackend};
    use std::sync::Arc;

    fn mock_injector() -> (SyntheticInputInjector, Arc<MockInputBackend>) {
        let backend = Arc::new(MockInputBackend::default());
        (
            SyntheticInputInjector::new(Box::new(Arc::clone(&backend))),
            backend,
        )
    }

    #[test]
    fn toggle_emits_single_direction_events() {
        let (injector, backend) = mock_injector();
        let mut latches = ModifierLatchSet::default();

        assert!(latches.toggle(Latch::Shift, &injector));
        assert!(latches.is_held(Latch::Shift));
        assert!(!latches.toggle(Latch::Shift, &injector));
        assert!(!latches.is_held(Latch::Shift));

        let events = backend.recorded();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].slot, KeySlot::Virtual(Latch::Shift.virtual_key()));
        assert_eq!(events[0].direction, KeyDirection::Down);
        assert_eq!(events[1].direction, KeyDirection::Up);
    }

    #[test]
    fn release_all_emits_one_up_per_held_latch() {
        let (injector, backend) = mock_injector();
        let mut latches = ModifierLatchSet::default();
        latches.toggle(Latch::Shift, &injector);
        latches.toggle(Latch::Ctrl, &injector);

        let downs = backend.recorded().len();
        latches.release_all(&injector);

        let events = backend.recorded();
        assert_eq!(events.len() - downs, 2);
        for event in &events[downs..] {
            assert_eq!(event.direction, KeyDirection::Up);
        }
        assert!(!latches.any_held());
    }

    #[test]
    fn release_all_with_nothing_held_emits_nothing() {
        let (injector, backend) = mock_injector();
        let mut latches = ModifierLatchSet::default();
        latches.release_all(&injector);
        assert!(backend.recorded().is_empty());
    }

    #[test]
    fn failed_injection_leaves_latch_unchanged() {
        let (injector, backend) = mock_injector();
        let mut latches = ModifierLatchSet::default();
        backend.fail.store(true, std::sync::atomic::Ordering::SeqCst);

        latches.toggle(Latch::Alt, &injector);
        assert!(!latches.is_held(Latch::Alt));
    }
}
