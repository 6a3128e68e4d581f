//! Input injection adapters.
//!
//! Holds the character map used to turn typed text into key strokes and the
//! recording injector used by tests and by the headless binary.

use mirror_core::domain::input::{key_action, source, VIRTUAL_KEYBOARD};

use crate::application::capabilities::KeyEvent;

pub mod mock;

/// Platform key codes used by [`key_events_for_ascii`].
pub mod keycode {
    pub const DIGIT_0: i32 = 7;
    pub const A: i32 = 29;
    pub const COMMA: i32 = 55;
    pub const PERIOD: i32 = 56;
    pub const SHIFT_LEFT: i32 = 59;
    pub const TAB: i32 = 61;
    pub const SPACE: i32 = 62;
    pub const ENTER: i32 = 66;
    pub const MINUS: i32 = 69;
    pub const EQUALS: i32 = 70;
    pub const SLASH: i32 = 76;
}

/// `META_SHIFT_ON | META_SHIFT_LEFT_ON`.
pub const META_SHIFT_LEFT: u32 = 0x41;

fn key_event(action: i32, keycode: i32, meta_state: u32) -> KeyEvent {
    KeyEvent {
        action,
        keycode,
        meta_state,
        device_id: VIRTUAL_KEYBOARD,
        source: source::KEYBOARD,
        down_time_millis: 0,
        event_time_millis: 0,
    }
}

/// Maps one UTF-16 unit to the key strokes that type it on a US layout.
///
/// Returns `None` for units the layout cannot produce.  Upper-case letters
/// are wrapped in a left-shift press.
pub fn key_events_for_ascii(unit: u16) -> Option<Vec<KeyEvent>> {
    let c = char::from_u32(u32::from(unit)).filter(char::is_ascii)?;
    let (code, shifted) = match c {
        'a'..='z' => (keycode::A + (c as i32 - 'a' as i32), false),
        'A'..='Z' => (keycode::A + (c as i32 - 'A' as i32), true),
        '0'..='9' => (keycode::DIGIT_0 + (c as i32 - '0' as i32), false),
        ' ' => (keycode::SPACE, false),
        '\n' => (keycode::ENTER, false),
        '\t' => (keycode::TAB, false),
        ',' => (keycode::COMMA, false),
        '.' => (keycode::PERIOD, false),
        '-' => (keycode::MINUS, false),
        '=' => (keycode::EQUALS, false),
        '/' => (keycode::SLASH, false),
        _ => return None,
    };

    if !shifted {
        return Some(vec![
            key_event(key_action::DOWN, code, 0),
            key_event(key_action::UP, code, 0),
        ]);
    }
    Some(vec![
        key_event(key_action::DOWN, keycode::SHIFT_LEFT, META_SHIFT_LEFT),
        key_event(key_action::DOWN, code, META_SHIFT_LEFT),
        key_event(key_action::UP, code, META_SHIFT_LEFT),
        key_event(key_action::UP, keycode::SHIFT_LEFT, 0),
    ])
}
