//! Hardware-vs-synthetic classification for observed pointer events.
//!
//! The classifier is pure: it looks only at the data handed to it and never
//! queries the OS itself, so it can be exercised without a live hook. The
//! platform glue in the observer snapshots `GetCurrentInputMessageSource`
//! right after an event and passes the result in; when that query is
//! unavailable or uninformative the flag/marker heuristic below decides.

use crate::input::injector::INJECT_TAG;

/// Low-level mouse hook flag bits, mirrored as plain integers so this module
/// stays platform-free. LLMHF_INJECTED / LLMHF_LOWER_IL_INJECTED.
pub const FLAG_INJECTED: u32 = 0x1;
pub const FLAG_LOWER_IL_INJECTED: u32 = 0x2;

/// Extra-info values above this are not plausible driver cookies; real
/// hardware leaves the field zero or a small tag.
const EXTRA_INFO_PLAUSIBLE_MAX: u64 = 0x1_0000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOrigin {
    Hardware,
    Injected,
    Unknown,
}

/// Device/origin snapshot from the input-message-source query, normalized
/// away from the raw platform types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSource {
    pub device_known: bool,
    pub origin: SourceOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    Hardware,
    Injected,
    System,
    Unavailable,
}

/// Classify one observed pointer-button event.
///
/// The message-source query is trusted when it reports anything definite; the
/// heuristic only runs when the query is absent or reports `Unavailable`.
pub fn classify(source: Option<MessageSource>, flags: u32, extra_info: usize) -> InputOrigin {
    if let Some(src) = source {
        if src.device_known {
            match src.origin {
                SourceOrigin::Hardware => return InputOrigin::Hardware,
                SourceOrigin::Injected => return InputOrigin::Injected,
                SourceOrigin::System => return InputOrigin::Unknown,
                SourceOrigin::Unavailable => {}
            }
        }
    }
    classify_by_heuristic(flags, extra_info)
}

/// Fallback when no message-source information exists for the event.
fn classify_by_heuristic(flags: u32, extra_info: usize) -> InputOrigin {
    if flags & (FLAG_INJECTED | FLAG_LOWER_IL_INJECTED) != 0 {
        return InputOrigin::Injected;
    }
    if extra_info == INJECT_TAG {
        return InputOrigin::Injected;
    }
    if extra_info as u64 > EXTRA_INFO_PLAUSIBLE_MAX {
        return InputOrigin::Injected;
    }
    InputOrigin::Hardware
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_marker_is_injected() {
        assert_eq!(classify(None, 0, INJECT_TAG), InputOrigin::Injected);
    }

    #[test]
    fn injected_flag_bits_are_injected() {
        assert_eq!(classify(None, FLAG_INJECTED, 0), InputOrigin::Injected);
        assert_eq!(
            classify(None, FLAG_LOWER_IL_INJECTED, 0),
            InputOrigin::Injected
        );
    }

    #[test]
    fn clean_event_is_hardware() {
        assert_eq!(classify(None, 0, 0), InputOrigin::Hardware);
    }

    #[test]
    fn implausible_extra_info_is_injected() {
        assert_eq!(
            classify(None, 0, 0xDEAD_BEEF_0000_0001),
            InputOrigin::Injected
        );
    }

    #[test]
    fn message_source_wins_over_heuristic() {
        let hw = MessageSource {
            device_known: true,
            origin: SourceOrigin::Hardware,
        };
        // Flags say injected, but the source query is authoritative.
        assert_eq!(classify(Some(hw), FLAG_INJECTED, 0), InputOrigin::Hardware);

        let injected = MessageSource {
            device_known: true,
            origin: SourceOrigin::Injected,
        };
        assert_eq!(classify(Some(injected), 0, 0), InputOrigin::Injected);
    }

    #[test]
    fn uninformative_source_falls_back() {
        let unavailable = MessageSource {
            device_known: false,
            origin: SourceOrigin::Unavailable,
        };
        assert_eq!(
            classify(Some(unavailable), 0, INJECT_TAG),
            InputOrigin::Injected
        );
        assert_eq!(classify(Some(unavailable), 0, 0), InputOrigin::Hardware);
    }

    #[test]
    fn system_origin_stays_unknown() {
        let system = MessageSource {
            device_known: true,
            origin: SourceOrigin::System,
        };
        assert_eq!(classify(Some(system), 0, 0), InputOrigin::Unknown);
    }
}
