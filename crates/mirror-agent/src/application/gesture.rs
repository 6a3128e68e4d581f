//! Gesture translation: turns a received motion message into the sequence of
//! motion events the input injector accepts.
//!
//! The injector only accepts one pointer transition per event, so a down or up
//! carrying several pointers is expanded:
//!
//! ```text
//! DOWN, 2 pointers   ->  DOWN (pointer 0)
//!                        POINTER_DOWN | 1 << 8 (pointers 0, 1)
//!
//! UP, N pointers     ->  POINTER_UP | i << 8 for i = N-1 down to 2
//!                        UP (remaining pointers)
//! ```
//!
//! A message with a non-zero action button is never expanded.  Instead the
//! primary down is followed by a button press, and the primary up is preceded
//! by a button release.

use mirror_core::domain::geometry::{rotate_point, Point};
use mirror_core::domain::input::{motion_action, source};
use mirror_core::protocol::messages::MotionEventMessage;
use mirror_core::DisplayInfo;
use tracing::warn;

use crate::application::capabilities::{MotionEvent, PointerSample};

/// Result of translating one motion message.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Translation {
    /// Events to inject, in order.
    pub events: Vec<MotionEvent>,
    /// `true` when the last event is a final `UP`, i.e. the gesture is over.
    pub gesture_ended: bool,
}

/// Tracks the start time of the gesture in progress.
#[derive(Debug, Default)]
pub struct GestureTranslator {
    /// Uptime at the last `DOWN`; `0` while no gesture is active.
    start_time_millis: i64,
}

impl GestureTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture_in_progress(&self) -> bool {
        self.start_time_millis != 0
    }

    /// Translates `msg` for a display described by `display`.
    ///
    /// The gesture start time is updated even when the display is unknown, so
    /// a gesture that begins on a display being torn down still ends cleanly.
    pub fn translate(
        &mut self,
        msg: &MotionEventMessage,
        display: Option<&DisplayInfo>,
        now_millis: i64,
    ) -> Translation {
        let action = msg.action;

        let mut down_time_millis = 0;
        if action != motion_action::HOVER_MOVE && action != motion_action::SCROLL {
            if action == motion_action::DOWN {
                self.start_time_millis = now_millis;
            }
            if self.start_time_millis == 0 {
                warn!(
                    "motion event started with action {action} instead of {}",
                    motion_action::DOWN
                );
                self.start_time_millis = now_millis;
            }
            down_time_millis = self.start_time_millis;
            if action == motion_action::UP {
                self.start_time_millis = 0;
            }
        }

        let event_source = if action == motion_action::HOVER_MOVE
            || msg.action_button != 0
            || msg.button_state != 0
        {
            source::MOUSE
        } else {
            source::STYLUS | source::TOUCHSCREEN
        };

        let Some(display) = display.filter(|d| d.is_valid()) else {
            return Translation::default();
        };
        if msg.pointers.is_empty() {
            return Translation::default();
        }

        let mut pointers = rotated_pointers(msg, display);
        let mut event = MotionEvent {
            display_id: msg.display_id,
            action,
            action_button: 0,
            button_state: msg.button_state,
            source: event_source,
            down_time_millis,
            event_time_millis: now_millis,
            pointers: pointers.clone(),
        };
        let mut events = Vec::new();

        if action == motion_action::DOWN {
            if msg.action_button != 0 {
                events.push(event.clone());
                event.action = motion_action::BUTTON_PRESS;
                event.action_button = msg.action_button;
            } else {
                for index in 1..pointers.len() {
                    event.pointers = pointers[..index].to_vec();
                    events.push(event.clone());
                    event.action = motion_action::with_pointer_index(motion_action::POINTER_DOWN, index);
                }
                event.pointers = pointers.clone();
            }
        } else if action == motion_action::UP {
            if msg.action_button != 0 {
                event.action = motion_action::BUTTON_RELEASE;
                event.action_button = msg.action_button;
                events.push(event.clone());
                event.action = motion_action::UP;
                event.action_button = 0;
            } else {
                // The lowest two pointers are released together by the final UP.
                let mut remaining = pointers.len();
                for index in (2..pointers.len()).rev() {
                    pointers[index].pressure = 0.0;
                    event.action = motion_action::with_pointer_index(motion_action::POINTER_UP, index);
                    event.pointers = pointers[..remaining].to_vec();
                    events.push(event.clone());
                    remaining = index;
                }
                event.pointers = pointers[..remaining].to_vec();
                event.action = motion_action::UP;
            }
        }

        let gesture_ended = event.action == motion_action::UP;
        events.push(event);
        Translation {
            events,
            gesture_ended,
        }
    }
}

fn rotated_pointers(msg: &MotionEventMessage, display: &DisplayInfo) -> Vec<PointerSample> {
    let natural_size = display.natural_size();
    let lifted_index = (motion_action::masked(msg.action) == motion_action::POINTER_UP)
        .then(|| motion_action::pointer_index(msg.action));
    msg.pointers
        .iter()
        .enumerate()
        .map(|(index, pointer)| {
            let point = rotate_point(
                Point::new(pointer.x, pointer.y),
                natural_size,
                display.rotation,
            );
            PointerSample {
                pointer_id: pointer.pointer_id,
                x: point.x,
                y: point.y,
                pressure: if lifted_index == Some(index) { 0.0 } else { 1.0 },
                axis_values: pointer.axis_values.clone(),
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::protocol::messages::Pointer;
    use mirror_core::{Rotation, Size};
    use mirror_core::domain::input::motion_action::{
        BUTTON_PRESS, BUTTON_RELEASE, DOWN, HOVER_MOVE, MOVE, POINTER_DOWN, POINTER_UP, SCROLL, UP,
    };

    fn portrait() -> DisplayInfo {
        DisplayInfo::new(Size::new(1080, 2400), Rotation::Deg0)
    }

    fn message(action: i32, pointer_count: i32) -> MotionEventMessage {
        MotionEventMessage {
            pointers: (0..pointer_count)
                .map(|id| Pointer {
                    x: 100 + id,
                    y: 200 + id,
                    pointer_id: id,
                    ..Pointer::default()
                })
                .collect(),
            action,
            button_state: 0,
            action_button: 0,
            display_id: 0,
        }
    }

    fn actions(translation: &Translation) -> Vec<i32> {
        translation.events.iter().map(|e| e.action).collect()
    }

    // ── Down / up expansion ───────────────────────────────────────────────────

    #[test]
    fn test_single_pointer_down_is_one_event() {
        let mut translator = GestureTranslator::new();
        let t = translator.translate(&message(DOWN, 1), Some(&portrait()), 1000);
        assert_eq!(actions(&t), vec![DOWN]);
        assert!(!t.gesture_ended);
    }

    #[test]
    fn test_two_pointer_down_expands_ascending() {
        // Arrange
        let mut translator = GestureTranslator::new();

        // Act
        let t = translator.translate(&message(DOWN, 2), Some(&portrait()), 1000);

        // Assert
        assert_eq!(actions(&t), vec![DOWN, POINTER_DOWN | 1 << 8]);
        assert_eq!(t.events[0].pointers.len(), 1);
        assert_eq!(t.events[1].pointers.len(), 2);
    }

    #[test]
    fn test_down_with_action_button_is_down_then_button_press() {
        // Arrange
        let mut translator = GestureTranslator::new();
        let mut msg = message(DOWN, 2);
        msg.action_button = 2;

        // Act
        let t = translator.translate(&msg, Some(&portrait()), 1000);

        // Assert
        assert_eq!(actions(&t), vec![DOWN, BUTTON_PRESS]);
        assert_eq!(t.events[0].action_button, 0);
        assert_eq!(t.events[1].action_button, 2);
        assert!(t.events.iter().all(|e| e.source == source::MOUSE));
    }

    #[test]
    fn test_two_pointer_up_is_single_up() {
        let mut translator = GestureTranslator::new();
        translator.translate(&message(DOWN, 2), Some(&portrait()), 1000);

        let t = translator.translate(&message(UP, 2), Some(&portrait()), 1100);

        assert_eq!(actions(&t), vec![UP]);
        assert_eq!(t.events[0].pointers.len(), 2);
        assert!(t.gesture_ended);
        assert!(!translator.gesture_in_progress());
    }

    #[test]
    fn test_up_with_action_button_is_button_release_then_up() {
        let mut translator = GestureTranslator::new();
        let mut msg = message(UP, 1);
        msg.action_button = 1;

        let t = translator.translate(&msg, Some(&portrait()), 1000);

        assert_eq!(actions(&t), vec![BUTTON_RELEASE, UP]);
        assert_eq!(t.events[1].action_button, 0);
        assert!(t.gesture_ended);
    }

    #[test]
    fn test_lifted_pointer_has_zero_pressure() {
        let mut translator = GestureTranslator::new();

        let t = translator.translate(&message(POINTER_UP | 1 << 8, 2), Some(&portrait()), 1000);

        let pressures: Vec<f32> = t.events[0].pointers.iter().map(|p| p.pressure).collect();
        assert_eq!(pressures, vec![1.0, 0.0]);
    }

    // ── Gesture start tracking ────────────────────────────────────────────────

    #[test]
    fn test_hover_and_scroll_do_not_touch_gesture_start() {
        // Arrange
        let mut translator = GestureTranslator::new();
        translator.translate(&message(DOWN, 1), Some(&portrait()), 100);

        // Act
        let hover = translator.translate(&message(HOVER_MOVE, 1), Some(&portrait()), 150);
        let scroll = translator.translate(&message(SCROLL, 1), Some(&portrait()), 160);
        let moved = translator.translate(&message(MOVE, 1), Some(&portrait()), 200);

        // Assert
        assert_eq!(hover.events[0].down_time_millis, 0);
        assert_eq!(hover.events[0].source, source::MOUSE);
        assert_eq!(scroll.events[0].down_time_millis, 0);
        assert_eq!(moved.events[0].down_time_millis, 100);
        assert_eq!(moved.events[0].event_time_millis, 200);
    }

    #[test]
    fn test_move_without_down_starts_gesture() {
        let mut translator = GestureTranslator::new();
        let t = translator.translate(&message(MOVE, 1), Some(&portrait()), 300);
        assert_eq!(t.events[0].down_time_millis, 300);
        assert!(translator.gesture_in_progress());
    }

    #[test]
    fn test_unknown_display_drops_events_but_tracks_gesture() {
        // Arrange
        let mut translator = GestureTranslator::new();

        // Act
        let dropped = translator.translate(&message(DOWN, 1), None, 100);
        let moved = translator.translate(&message(MOVE, 1), Some(&portrait()), 200);

        // Assert
        assert!(dropped.events.is_empty());
        assert_eq!(moved.events[0].down_time_millis, 100);
    }

    // ── Coordinates and source ────────────────────────────────────────────────

    #[test]
    fn test_coordinates_follow_display_rotation() {
        // Arrange: a portrait panel currently shown in landscape.
        let display = DisplayInfo::new(Size::new(2400, 1080), Rotation::Deg90);
        let mut translator = GestureTranslator::new();

        // Act
        let t = translator.translate(&message(DOWN, 1), Some(&display), 100);

        // Assert: (100, 200) -> (200, 1080 - 100)
        let p = &t.events[0].pointers[0];
        assert_eq!((p.x, p.y), (200, 980));
    }

    #[test]
    fn test_touch_source_without_buttons() {
        let mut translator = GestureTranslator::new();
        let t = translator.translate(&message(DOWN, 1), Some(&portrait()), 100);
        assert_eq!(t.events[0].source, source::STYLUS | source::TOUCHSCREEN);
    }

    #[test]
    fn test_button_state_selects_mouse_source() {
        let mut translator = GestureTranslator::new();
        let mut msg = message(MOVE, 1);
        msg.button_state = 1;
        let t = translator.translate(&msg, Some(&portrait()), 100);
        assert_eq!(t.events[0].source, source::MOUSE);
        assert_eq!(t.events[0].button_state, 1);
    }
}
