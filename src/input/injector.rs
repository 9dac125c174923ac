//! Synthetic key-event construction and submission.
//!
//! Events are built as plain records first and handed to an [`InputBackend`]
//! for submission, so ordering rules are testable without touching
//! `SendInput`. Every record the default backend submits carries
//! [`INJECT_TAG`] in its extra-info field; the classifier and hook callbacks
//! use that tag to recognize our own events coming back around.

use anyhow::Result;

/// Extra-info marker stamped on every event this process injects.
pub const INJECT_TAG: usize = 0x4F56_4B59; // "OVKY"

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

/// The two event shapes the overlay produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    /// A virtual-key code (control keys, modifiers, letters via VK).
    Virtual(u16),
    /// A UTF-16 code unit delivered as text input rather than a keycode.
    Unicode(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventRecord {
    pub slot: KeySlot,
    pub direction: KeyDirection,
}

/// Build the ordered down/up pair for one logical virtual-key press.
pub fn virtual_key_press(vk: u16) -> [KeyEventRecord; 2] {
    [
        KeyEventRecord {
            slot: KeySlot::Virtual(vk),
            direction: KeyDirection::Down,
        },
        KeyEventRecord {
            slot: KeySlot::Virtual(vk),
            direction: KeyDirection::Up,
        },
    ]
}

/// Build the ordered down/up pairs for a Unicode scalar. Characters outside
/// the BMP encode to a surrogate pair, pressed low-to-high in order.
pub fn unicode_press(ch: char) -> Vec<KeyEventRecord> {
    let mut units = [0u16; 2];
    let encoded = ch.encode_utf16(&mut units);
    let mut out = Vec::with_capacity(encoded.len() * 2);
    for &unit in encoded.iter() {
        out.push(KeyEventRecord {
            slot: KeySlot::Unicode(unit),
            direction: KeyDirection::Down,
        });
        out.push(KeyEventRecord {
            slot: KeySlot::Unicode(unit),
            direction: KeyDirection::Up,
        });
    }
    out
}

/// Submission seam. The default backend calls `SendInput`; tests substitute a
/// recorder.
pub trait InputBackend: Send + Sync {
    fn submit(&self, events: &[KeyEventRecord]) -> Result<()>;
}

pub struct SyntheticInputInjector {
    backend: Box<dyn InputBackend>,
}

impl Default for SyntheticInputInjector {
    fn default() -> Self {
        Self::new(Box::new(SendInputBackend))
    }
}

impl SyntheticInputInjector {
    pub fn new(backend: Box<dyn InputBackend>) -> Self {
        Self { backend }
    }

    /// Send a full down/up press for a virtual key. Returns whether the
    /// submission was accepted; failures are logged, never retried.
    pub fn press_virtual_key(&self, vk: u16) -> bool {
        self.submit(&virtual_key_press(vk))
    }

    /// Send a Unicode character as a text event pair.
    pub fn send_unicode_char(&self, ch: char) -> bool {
        self.submit(&unicode_press(ch))
    }

    /// Send a lone key-down. Used for sticky modifiers whose release may come
    /// many events later.
    pub fn key_down(&self, vk: u16) -> bool {
        self.submit(&[KeyEventRecord {
            slot: KeySlot::Virtual(vk),
            direction: KeyDirection::Down,
        }])
    }

    /// Send a lone key-up, the other half of a caller-controlled press.
    pub fn key_up(&self, vk: u16) -> bool {
        self.submit(&[KeyEventRecord {
            slot: KeySlot::Virtual(vk),
            direction: KeyDirection::Up,
        }])
    }

    fn submit(&self, events: &[KeyEventRecord]) -> bool {
        match self.backend.submit(events) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(?err, count = events.len(), "key injection failed");
                false
            }
        }
    }
}

/// Default backend submitting through Win32 `SendInput`.
pub struct SendInputBackend;

#[cfg(windows)]
impl InputBackend for SendInputBackend {
    fn submit(&self, events: &[KeyEventRecord]) -> Result<()> {
        use windows::Win32::UI::Input::KeyboardAndMouse::{
            SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
            KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, VIRTUAL_KEY,
        };

        if events.is_empty() {
            return Ok(());
        }

        let inputs: Vec<INPUT> = events
            .iter()
            .map(|event| {
                let mut flags = 0u32;
                let (vk, scan) = match event.slot {
                    KeySlot::Virtual(vk) => (vk, 0),
                    KeySlot::Unicode(unit) => {
                        flags |= KEYEVENTF_UNICODE.0;
                        (0, unit)
                    }
                };
                if event.direction == KeyDirection::Up {
                    flags |= KEYEVENTF_KEYUP.0;
                }
                INPUT {
                    r#type: INPUT_KEYBOARD,
                    Anonymous: INPUT_0 {
                        ki: KEYBDINPUT {
                            wVk: VIRTUAL_KEY(vk),
                            wScan: scan,
                            dwFlags: KEYBD_EVENT_FLAGS(flags),
                            time: 0,
                            dwExtraInfo: INJECT_TAG,
                        },
                    },
                }
            })
            .collect();

        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            anyhow::bail!("SendInput accepted {sent} of {} events", inputs.len());
        }
        Ok(())
    }
}

#[cfg(not(windows))]
impl InputBackend for SendInputBackend {
    fn submit(&self, _events: &[KeyEventRecord]) -> Result<()> {
        anyhow::bail!("key injection is only supported on Windows")
    }
}

/// Recording backend for tests.
#[derive(Default)]
pub struct MockInputBackend {
    pub events: std::sync::Mutex<Vec<KeyEventRecord>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl MockInputBackend {
    pub fn recorded(&self) -> Vec<KeyEventRecord> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl InputBackend for std::sync::Arc<MockInputBackend> {
    fn submit(&self, events: &[KeyEventRecord]) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("mock backend failure");
        }
        if let Ok(mut guard) = self.events.lock() {
            guard.extend_from_slice(events);
        }
        Ok(())
    }
}
