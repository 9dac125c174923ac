//! Key-label lookup and the on-screen layout description.
//!
//! The lookup is a pure function so the rest of the crate can resolve labels
//! without touching any platform API. Virtual-key values follow the Win32
//! assignments regardless of the build target.

/// Latchable modifier keys exposed as sticky on-screen buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latch {
    Shift,
    Ctrl,
    Alt,
    CapsLock,
}

impl Latch {
    pub fn virtual_key(self) -> u16 {
        match self {
            Latch::Shift => 0x10,
            Latch::Ctrl => 0x11,
            Latch::Alt => 0x12,
            Latch::CapsLock => 0x14,
        }
    }
}

/// What pressing an on-screen key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Send a virtual-key down/up pair (control keys, letters, digits).
    Virtual(u16),
    /// Send a Unicode character as a text event.
    Char(char),
    /// Toggle a sticky modifier.
    Modifier(Latch),
}

/// One button in the on-screen layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyDef {
    pub label: &'static str,
    pub action: KeyAction,
    /// Width relative to a standard key; 1.0 for letter keys.
    pub width: f32,
    /// Whether holding the button auto-repeats the key.
    pub repeats: bool,
}

const fn key(label: &'static str, vk: u16) -> KeyDef {
    KeyDef {
        label,
        action: KeyAction::Virtual(vk),
        width: 1.0,
        repeats: false,
    }
}

const fn repeating(label: &'static str, vk: u16, width: f32) -> KeyDef {
    KeyDef {
        label,
        action: KeyAction::Virtual(vk),
        width,
        repeats: true,
    }
}

const fn wide(label: &'static str, vk: u16, width: f32) -> KeyDef {
    KeyDef {
        label,
        action: KeyAction::Virtual(vk),
        width,
        repeats: false,
    }
}

const fn latch(label: &'static str, m: Latch, width: f32) -> KeyDef {
    KeyDef {
        label,
        action: KeyAction::Modifier(m),
        width,
        repeats: false,
    }
}

/// The default QWERTY layout, row by row.
pub fn layout_rows() -> Vec<Vec<KeyDef>> {
    vec![
        vec![
            key("Esc", 0x1B),
            key("1", 0x31),
            key("2", 0x32),
            key("3", 0x33),
            key("4", 0x34),
            key("5", 0x35),
            key("6", 0x36),
            key("7", 0x37),
            key("8", 0x38),
            key("9", 0x39),
            key("0", 0x30),
            repeating("Bksp", 0x08, 1.6),
        ],
        vec![
            wide("Tab", 0x09, 1.4),
            key("Q", 0x51),
            key("W", 0x57),
            key("E", 0x45),
            key("R", 0x52),
            key("T", 0x54),
            key("Y", 0x59),
            key("U", 0x55),
            key("I", 0x49),
            key("O", 0x4F),
            key("P", 0x50),
            repeating("Del", 0x2E, 1.2),
        ],
        vec![
            latch("Caps", Latch::CapsLock, 1.6),
            key("A", 0x41),
            key("S", 0x53),
            key("D", 0x44),
            key("F", 0x46),
            key("G", 0x47),
            key("H", 0x48),
            key("J", 0x4A),
            key("K", 0x4B),
            key("L", 0x4C),
            wide("Enter", 0x0D, 1.6),
        ],
        vec![
            latch("Shift", Latch::Shift, 2.0),
            key("Z", 0x5A),
            key("X", 0x58),
            key("C", 0x43),
            key("V", 0x56),
            key("B", 0x42),
            key("N", 0x4E),
            key("M", 0x4D),
            KeyDef {
                label: ",",
                action: KeyAction::Char(','),
                width: 1.0,
                repeats: false,
            },
            KeyDef {
                label: ".",
                action: KeyAction::Char('.'),
                width: 1.0,
                repeats: false,
            },
            latch("Shift ", Latch::Shift, 1.4),
        ],
        vec![
            latch("Ctrl", Latch::Ctrl, 1.4),
            latch("Alt", Latch::Alt, 1.4),
            wide("Space", 0x20, 6.0),
            repeating("←", 0x25, 1.0),
            repeating("↑", 0x26, 1.0),
            repeating("↓", 0x28, 1.0),
            repeating("→", 0x27, 1.0),
        ],
    ]
}

/// Resolve a key label to its virtual-key code.
///
/// This is the boundary the GUI and settings code go through; it knows nothing
/// about the injection path.
pub fn virtual_key_from_label(label: &str) -> Option<u16> {
    let upper = label.trim().to_uppercase();
    let vk = match upper.as_str() {
        "BACKSPACE" | "BKSP" => 0x08,
        "TAB" => 0x09,
        "ENTER" | "RETURN" => 0x0D,
        "SHIFT" => 0x10,
        "CTRL" | "CONTROL" => 0x11,
        "ALT" => 0x12,
        "CAPSLOCK" | "CAPS" => 0x14,
        "ESC" | "ESCAPE" => 0x1B,
        "SPACE" => 0x20,
        "PAGEUP" => 0x21,
        "PAGEDOWN" => 0x22,
        "END" => 0x23,
        "HOME" => 0x24,
        "LEFT" => 0x25,
        "UP" => 0x26,
        "RIGHT" => 0x27,
        "DOWN" => 0x28,
        "INSERT" => 0x2D,
        "DELETE" | "DEL" => 0x2E,
        "LEFTSHIFT" => 0xA0,
        "RIGHTSHIFT" => 0xA1,
        "LEFTCTRL" => 0xA2,
        "RIGHTCTRL" => 0xA3,
        "LEFTALT" => 0xA4,
        "RIGHTALT" => 0xA5,
        _ => {
            if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u16>().ok()) {
                if (1..=24).contains(&n) {
                    return Some(0x6F + n);
                }
                return None;
            }
            if upper.len() == 1 {
                let ch = upper.chars().next()?;
                if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
                    return Some(ch as u16);
                }
            }
            return None;
        }
    };
    Some(vk)
}
