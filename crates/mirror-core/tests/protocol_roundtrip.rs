//! Integration tests for the mirror-core protocol codec.
//!
//! These tests verify complete round-trip encoding and decoding of every
//! message kind through the public API, plus the byte-level properties the
//! controller on the other end relies on.

use std::collections::BTreeMap;
use std::io::Cursor;

use mirror_core::{
    decode_message, encode_message,
    protocol::{
        messages::{
            DisplayConfigurationResponseMessage, DisplayDescriptor, ErrorResponseMessage,
            KeyEventMessage, MotionEventMessage, Pointer, SetAppLanguageMessage,
            StartClipboardSyncMessage, UiSettingsResponseMessage, UiSettingsSnapshot,
            VideoResolutionMessage,
        },
        Base128Reader,
    },
    ControlMessage, ProtocolError, Size,
};

/// Encodes a message and then decodes it, asserting that every byte was consumed.
fn roundtrip(msg: ControlMessage) -> ControlMessage {
    let bytes = encode_message(&msg);
    let (decoded, consumed) = decode_message(&bytes).expect("decode must succeed");
    assert_eq!(consumed, bytes.len(), "all bytes must be consumed");
    decoded
}

/// Integer values at the varint length boundaries.
const BOUNDARY_VALUES: [i32; 5] = [0, 127, 128, i32::MAX, -1];

fn every_message(value: i32) -> Vec<ControlMessage> {
    let mut axis_values = BTreeMap::new();
    axis_values.insert(9, value as f32);
    vec![
        ControlMessage::MotionEvent(MotionEventMessage {
            pointers: vec![Pointer {
                x: value,
                y: value,
                pointer_id: value,
                axis_values,
            }],
            action: value,
            button_state: value,
            action_button: value,
            display_id: value,
        }),
        ControlMessage::KeyEvent(KeyEventMessage {
            action: value,
            keycode: value,
            meta_state: value as u32,
        }),
        ControlMessage::TextInput(format!("text {value}")),
        ControlMessage::SetDeviceOrientation(value),
        ControlMessage::SetMaxVideoResolution(VideoResolutionMessage {
            display_id: value,
            max_size: Size::new(value, value),
        }),
        ControlMessage::StartVideoStream(VideoResolutionMessage {
            display_id: value,
            max_size: Size::new(value, value),
        }),
        ControlMessage::StopVideoStream(value),
        ControlMessage::StartClipboardSync(StartClipboardSyncMessage {
            max_synced_length: value,
            text: "clipboard \u{00e9}\u{4e2d}".to_string(),
        }),
        ControlMessage::StopClipboardSync,
        ControlMessage::RequestDeviceState(value),
        ControlMessage::ClipboardChanged(format!("copied {value}")),
        ControlMessage::SupportedDeviceStates("DeviceState{identifier=0}".to_string()),
        ControlMessage::DeviceStateChanged(value),
        ControlMessage::DisplayConfigurationRequest(value),
        ControlMessage::DisplayConfigurationResponse(DisplayConfigurationResponseMessage {
            request_id: value,
            displays: vec![DisplayDescriptor {
                display_id: value,
                logical_size: Size::new(value, value),
                rotation: 1,
                display_type: value,
            }],
        }),
        ControlMessage::DisplayAdded(value),
        ControlMessage::DisplayRemoved(value),
        ControlMessage::ErrorResponse(ErrorResponseMessage {
            request_id: value,
            message: "no displays".to_string(),
        }),
        ControlMessage::UiSettingsRequest(value),
        ControlMessage::UiSettingsResponse(UiSettingsResponseMessage {
            request_id: value,
            settings: UiSettingsSnapshot {
                dark_mode: true,
                talkback_on: true,
                foreground_application_id: "com.example".to_string(),
                app_locale: "fr-FR".to_string(),
                font_size: value,
                density: value,
                ..UiSettingsSnapshot::default()
            },
        }),
        ControlMessage::SetDarkMode(value % 2 == 0),
        ControlMessage::SetFontSize(value),
        ControlMessage::SetScreenDensity(value),
        ControlMessage::SetTalkBack(true),
        ControlMessage::SetSelectToSpeak(false),
        ControlMessage::SetAppLanguage(SetAppLanguageMessage {
            application_id: "com.example".to_string(),
            locale: "ja".to_string(),
        }),
        ControlMessage::SetGestureNavigation(true),
    ]
}

#[test]
fn test_roundtrip_every_kind_at_boundary_values() {
    for value in BOUNDARY_VALUES {
        for original in every_message(value) {
            let decoded = roundtrip(original.clone());
            assert_eq!(original, decoded, "value {value}");
        }
    }
}

#[test]
fn test_catalogue_covers_every_kind() {
    let mut kinds: Vec<u32> = every_message(0).iter().map(|m| m.kind() as u32).collect();
    kinds.sort_unstable();
    assert_eq!(kinds, (1..=27).collect::<Vec<_>>());
}

#[test]
fn test_negative_integers_take_five_bytes() {
    let bytes = encode_message(&ControlMessage::SetFontSize(-2));
    assert_eq!(bytes, vec![22, 0xFE, 0xFF, 0xFF, 0xFF, 0x0F]);
}

#[test]
fn test_request_physical_device_state_encodes_zero() {
    let bytes = encode_message(&ControlMessage::RequestDeviceState(-1));
    assert_eq!(bytes, vec![10, 0]);
}

#[test]
fn test_unknown_kind() {
    let result = decode_message(&[0x80, 0x01]);
    assert!(matches!(result, Err(ProtocolError::UnknownKind(128))));
}

#[test]
fn test_truncation_at_every_offset_is_end_of_stream() {
    let bytes = encode_message(&ControlMessage::StartClipboardSync(
        StartClipboardSyncMessage {
            max_synced_length: 300,
            text: "hello".to_string(),
        },
    ));
    for cut in 0..bytes.len() {
        let result = decode_message(&bytes[..cut]);
        assert!(
            matches!(result, Err(ProtocolError::EndOfStream)),
            "cut at {cut} gave {result:?}"
        );
    }
}

#[test]
fn test_three_pointer_motion_event_keeps_two() {
    // Arrange
    let pointers: Vec<Pointer> = (0..3)
        .map(|id| Pointer {
            x: 10 * id,
            y: 20 * id,
            pointer_id: id,
            axis_values: BTreeMap::new(),
        })
        .collect();
    let bytes = encode_message(&ControlMessage::MotionEvent(MotionEventMessage {
        pointers: pointers.clone(),
        action: 2,
        button_state: 0,
        action_button: 0,
        display_id: 0,
    }));

    // Act
    let (decoded, consumed) = decode_message(&bytes).unwrap();

    // Assert
    assert_eq!(consumed, bytes.len());
    let ControlMessage::MotionEvent(motion) = decoded else {
        panic!("expected a motion event");
    };
    assert_eq!(motion.pointers, pointers[..2].to_vec());
}

#[test]
fn test_stream_of_messages_decodes_in_order() {
    // Arrange
    let sent = vec![
        ControlMessage::StopClipboardSync,
        ControlMessage::TextInput("hi".to_string()),
        ControlMessage::StopVideoStream(3),
    ];
    let bytes: Vec<u8> = sent.iter().flat_map(encode_message).collect();
    let mut reader = Base128Reader::with_capacity(Cursor::new(bytes), 3);

    // Act
    let received: Vec<ControlMessage> = (0..sent.len())
        .map(|_| ControlMessage::read(&mut reader).expect("decode must succeed"))
        .collect();

    // Assert
    assert_eq!(received, sent);
    assert!(matches!(
        ControlMessage::read(&mut reader),
        Err(ProtocolError::EndOfStream)
    ));
}
