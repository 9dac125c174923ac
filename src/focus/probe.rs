//! Decides whether the focused element is editable text.
//!
//! The probe never reports an error: any failure along the accessibility path
//! degrades to the class-name heuristic, and the accessibility reference is
//! released on every exit (the interface pointer is RAII-owned, so the release
//! happens when it drops regardless of which branch returns).

use crate::focus::window_ref::WindowRef;

/// Accessibility role codes this probe understands (MSAA values).
const ROLE_EDITABLE_TEXT: u32 = 0x2A;
const ROLE_DOCUMENT: u32 = 0x0F;

/// State bits.
const STATE_FOCUSABLE: u32 = 0x0010_0000;
const STATE_READ_ONLY: u32 = 0x40;

/// Role/state decision, kept pure for tests. The plain editable-text role is
/// decisive on its own; document roles also need a usable state bitmask.
/// `state` is `None` when the state read failed; a `None` result is the
/// caller's cue to use the class heuristic.
pub fn editable_from_role_state(role: u32, state: Option<u32>) -> Option<bool> {
    if role == ROLE_EDITABLE_TEXT {
        return Some(true);
    }
    if role == ROLE_DOCUMENT {
        let state = state?;
        let focusable = state & STATE_FOCUSABLE != 0;
        let read_only = state & STATE_READ_ONLY != 0;
        return Some(focusable && !read_only);
    }
    Some(false)
}

/// Class-name fallback: classic edit controls and their descendants.
pub fn class_name_is_editable(class_name: &str) -> bool {
    class_name == "Edit" || class_name.starts_with("RichEdit") || class_name.contains("Edit")
}

/// Full probe for a focus notification triple. Accessibility failures never
/// escape; they fall back to the class heuristic.
#[cfg(windows)]
pub fn is_editable_target(window: &WindowRef, object_id: i32, child_id: i32) -> bool {
    match query_role_state(window.id, object_id, child_id) {
        Some((role, state)) => match editable_from_role_state(role, state) {
            Some(editable) => editable,
            None => class_name_is_editable(&window.class_name),
        },
        None => class_name_is_editable(&window.class_name),
    }
}

#[cfg(not(windows))]
pub fn is_editable_target(window: &WindowRef, _object_id: i32, _child_id: i32) -> bool {
    class_name_is_editable(&window.class_name)
}

/// Acquire the accessible object for the event and read (role, state). The
/// state is `None` when only the role could be read. A `None` result means the
/// element yielded nothing usable at all.
#[cfg(windows)]
fn query_role_state(id: isize, object_id: i32, child_id: i32) -> Option<(u32, Option<u32>)> {
    use windows::core::VARIANT;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Accessibility::{AccessibleObjectFromEvent, IAccessible};

    let hwnd = HWND(id as *mut core::ffi::c_void);
    let mut acc: Option<IAccessible> = None;
    let mut child = VARIANT::default();

    let acquired = unsafe {
        AccessibleObjectFromEvent(
            hwnd,
            object_id as u32,
            child_id as u32,
            &mut acc,
            &mut child,
        )
    };
    if acquired.is_err() {
        return None;
    }
    // `acc` drops at every return below, releasing the reference.
    let acc = acc?;

    let role = unsafe { acc.get_accRole(&child) }
        .ok()
        .and_then(|v| variant_to_u32(&v))?;
    let state = unsafe { acc.get_accState(&child) }
        .ok()
        .and_then(|v| variant_to_u32(&v));

    Some((role, state))
}

#[cfg(windows)]
fn variant_to_u32(value: &windows::core::VARIANT) -> Option<u32> {
    i32::try_from(value).ok().map(|v| v as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_role_is_editable_regardless_of_state() {
        assert_eq!(
            editable_from_role_state(ROLE_EDITABLE_TEXT, Some(STATE_FOCUSABLE)),
            Some(true)
        );
        assert_eq!(
            editable_from_role_state(ROLE_EDITABLE_TEXT, Some(STATE_READ_ONLY)),
            Some(true)
        );
        assert_eq!(editable_from_role_state(ROLE_EDITABLE_TEXT, None), Some(true));
    }

    #[test]
    fn document_role_requires_focusable_and_writable() {
        assert_eq!(
            editable_from_role_state(ROLE_DOCUMENT, Some(STATE_FOCUSABLE)),
            Some(true)
        );
        assert_eq!(
            editable_from_role_state(ROLE_DOCUMENT, Some(STATE_FOCUSABLE | STATE_READ_ONLY)),
            Some(false)
        );
        assert_eq!(editable_from_role_state(ROLE_DOCUMENT, Some(0)), Some(false));
        // Document role with no readable state yields no decision.
        assert_eq!(editable_from_role_state(ROLE_DOCUMENT, None), None);
    }

    #[test]
    fn unrelated_roles_are_not_editable() {
        // Push button.
        assert_eq!(editable_from_role_state(0x2B, Some(STATE_FOCUSABLE)), Some(false));
    }

    #[test]
    fn class_heuristic_matches_edit_families() {
        assert!(class_name_is_editable("Edit"));
        assert!(class_name_is_editable("RichEdit20W"));
        assert!(class_name_is_editable("RichEdit50W"));
        assert!(class_name_is_editable("TEdit"));
        assert!(!class_name_is_editable("Button"));
        assert!(!class_name_is_editable("Chrome_WidgetWin_1"));
    }
}
