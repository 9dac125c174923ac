//! Hold-to-repeat for keys like Backspace and the arrows.
//!
//! A small machine advanced by scheduler ticks: a held key waits out the
//! initial delay, then fires at the repeat interval until released. At most
//! one key repeats at a time; pressing a second key replaces the first.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepeatState {
    Idle,
    InitialDelay { vk: u16, pressed_at: Instant },
    Repeating { vk: u16, last_fire: Instant },
}

pub struct KeyRepeat {
    state: RepeatState,
    initial_delay: Duration,
    interval: Duration,
}

impl Default for KeyRepeat {
    fn default() -> Self {
        Self::new(Duration::from_millis(400), Duration::from_millis(80))
    }
}

impl KeyRepeat {
    pub fn new(initial_delay: Duration, interval: Duration) -> Self {
        Self {
            state: RepeatState::Idle,
            initial_delay,
            interval,
        }
    }

    /// A repeat-capable key went down. The first press event is the caller's;
    /// this only arms the repeat cycle.
    pub fn press(&mut self, vk: u16, now: Instant) {
        self.state = RepeatState::InitialDelay {
            vk,
            pressed_at: now,
        };
    }

    /// Any release cancels whatever was armed or repeating.
    pub fn release(&mut self) {
        self.state = RepeatState::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.state != RepeatState::Idle
    }

    /// Advance on a scheduler tick. Returns the key to re-fire, if any.
    pub fn tick(&mut self, now: Instant) -> Option<u16> {
        match self.state {
            RepeatState::Idle => None,
            RepeatState::InitialDelay { vk, pressed_at } => {
                if now.duration_since(pressed_at) >= self.initial_delay {
                    self.state = RepeatState::Repeating { vk, last_fire: now };
                    Some(vk)
                } else {
                    None
                }
            }
            RepeatState::Repeating { vk, last_fire } => {
                if now.duration_since(last_fire) >= self.interval {
                    self.state = RepeatState::Repeating { vk, last_fire: now };
                    Some(vk)
                } else {
                    None
                }
            }
        }
    }
}
