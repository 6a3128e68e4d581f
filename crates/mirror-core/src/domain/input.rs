//! Platform input constants.
//!
//! Values match the host platform's input framework so that motion and key
//! messages can be forwarded without translation tables.

/// Motion event actions.  The low byte is the action, bits 8..16 carry the
/// index of the pointer a `POINTER_DOWN`/`POINTER_UP` refers to.
pub mod motion_action {
    pub const DOWN: i32 = 0;
    pub const UP: i32 = 1;
    pub const MOVE: i32 = 2;
    pub const CANCEL: i32 = 3;
    pub const POINTER_DOWN: i32 = 5;
    pub const POINTER_UP: i32 = 6;
    pub const HOVER_MOVE: i32 = 7;
    pub const SCROLL: i32 = 8;
    pub const BUTTON_PRESS: i32 = 11;
    pub const BUTTON_RELEASE: i32 = 12;

    pub const MASK: i32 = 0xff;
    pub const POINTER_INDEX_SHIFT: u32 = 8;
    pub const POINTER_INDEX_MASK: i32 = 0xff00;

    /// Strips the pointer index from an action.
    pub fn masked(action: i32) -> i32 {
        action & MASK
    }

    /// Extracts the pointer index from an action.
    pub fn pointer_index(action: i32) -> usize {
        ((action & POINTER_INDEX_MASK) >> POINTER_INDEX_SHIFT) as usize
    }

    /// Builds an action that refers to the pointer at `index`.
    pub fn with_pointer_index(action: i32, index: usize) -> i32 {
        action | ((index as i32) << POINTER_INDEX_SHIFT)
    }
}

/// Key event actions.
pub mod key_action {
    pub const DOWN: i32 = 0;
    pub const UP: i32 = 1;
    /// Not a platform action: asks the agent to send a down followed by an up.
    pub const DOWN_AND_UP: i32 = 8;
}

/// Input source classes.
pub mod source {
    pub const KEYBOARD: i32 = 0x0000_0101;
    pub const TOUCHSCREEN: i32 = 0x0000_1002;
    pub const MOUSE: i32 = 0x0000_2002;
    pub const STYLUS: i32 = 0x0000_4002;
}

pub mod keycode {
    pub const WAKEUP: i32 = 224;
}

/// Device id used for events that do not come from a physical device.
pub const VIRTUAL_KEYBOARD: i32 = -1;

#[cfg(test)]
mod tests {
    use super::motion_action::*;

    #[test]
    fn test_pointer_index_round_trip() {
        let action = with_pointer_index(POINTER_DOWN, 1);
        assert_eq!(action, 0x105);
        assert_eq!(masked(action), POINTER_DOWN);
        assert_eq!(pointer_index(action), 1);
    }

    #[test]
    fn test_plain_action_has_index_zero() {
        assert_eq!(pointer_index(MOVE), 0);
        assert_eq!(masked(MOVE), MOVE);
    }
}
