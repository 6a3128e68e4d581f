//! Binary codec for encoding and decoding control channel messages.
//!
//! Wire format:
//! ```text
//! [kind:varint][field:varint | string]...
//! ```
//! There is no length header: a message ends where its last field ends, so the
//! decoder must know the field layout of every kind.  See [`crate::protocol::base128`]
//! for the encoding of individual fields.

use std::io::{self, Read};

use thiserror::Error;
use tracing::warn;

use crate::domain::geometry::Size;
use crate::protocol::base128::{Base128Reader, Base128Writer};
use crate::protocol::messages::{
    ControlMessage, DisplayConfigurationResponseMessage, DisplayDescriptor, ErrorResponseMessage,
    KeyEventMessage, MessageKind, MotionEventMessage, Pointer, SetAppLanguageMessage,
    StartClipboardSyncMessage, UiSettingsResponseMessage, UiSettingsSnapshot,
    VideoResolutionMessage, MAX_POINTERS,
};

/// Errors that can occur while decoding a message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream ended before the message was complete.  A peer closing the
    /// connection surfaces as this variant.
    #[error("end of stream")]
    EndOfStream,

    /// The kind tag is not part of the message catalogue.
    #[error("unknown message kind: {0}")]
    UnknownKind(u32),

    /// A field could not be parsed (over-long varint, invalid text, empty text input, etc.).
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The underlying byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Returns `true` when the peer went away rather than sent garbage.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ProtocolError::EndOfStream)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`ControlMessage`] including its kind tag.
///
/// # Examples
///
/// ```rust
/// use mirror_core::protocol::{decode_message, encode_message};
/// use mirror_core::ControlMessage;
///
/// let msg = ControlMessage::StopVideoStream(0);
/// let bytes = encode_message(&msg);
/// assert_eq!(bytes, vec![7, 0]);
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(msg: &ControlMessage) -> Vec<u8> {
    let mut writer = Base128Writer::with_capacity(16);
    msg.write_to(&mut writer);
    writer.into_bytes()
}

/// Decodes one [`ControlMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the number of bytes consumed, so the
/// caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::EndOfStream`] if `bytes` holds only part of a
/// message and another variant if the bytes are malformed.
pub fn decode_message(bytes: &[u8]) -> Result<(ControlMessage, usize), ProtocolError> {
    let mut reader = Base128Reader::with_capacity(bytes, bytes.len().max(1));
    let msg = ControlMessage::read(&mut reader)?;
    let consumed = bytes.len() - reader.get_ref().len() - reader.buffered();
    Ok((msg, consumed))
}

impl ControlMessage {
    /// Appends the kind tag and every field of this message to `writer`.
    pub fn write_to(&self, writer: &mut Base128Writer) {
        writer.write_u32(self.kind() as u32);
        match self {
            ControlMessage::MotionEvent(m) => encode_motion_event(writer, m),
            ControlMessage::KeyEvent(m) => {
                writer.write_i32(m.action);
                writer.write_i32(m.keycode);
                writer.write_u32(m.meta_state);
            }
            ControlMessage::TextInput(text) => writer.write_utf16(text),
            ControlMessage::SetMaxVideoResolution(m) | ControlMessage::StartVideoStream(m) => {
                writer.write_i32(m.display_id);
                writer.write_i32(m.max_size.width);
                writer.write_i32(m.max_size.height);
            }
            ControlMessage::StartClipboardSync(m) => {
                writer.write_i32(m.max_synced_length);
                writer.write_str(&m.text);
            }
            ControlMessage::StopClipboardSync => {}
            // Device states travel shifted by one so that the physical state (-1)
            // is a single zero byte.
            ControlMessage::RequestDeviceState(state)
            | ControlMessage::DeviceStateChanged(state) => {
                writer.write_i32(state.wrapping_add(1));
            }
            ControlMessage::ClipboardChanged(text)
            | ControlMessage::SupportedDeviceStates(text) => writer.write_str(text),
            ControlMessage::DisplayConfigurationResponse(m) => {
                writer.write_i32(m.request_id);
                writer.write_u32(m.displays.len() as u32);
                for display in &m.displays {
                    writer.write_i32(display.display_id);
                    writer.write_i32(display.logical_size.width);
                    writer.write_i32(display.logical_size.height);
                    writer.write_i32(display.rotation);
                    writer.write_i32(display.display_type);
                }
            }
            ControlMessage::ErrorResponse(m) => {
                writer.write_i32(m.request_id);
                writer.write_str(&m.message);
            }
            ControlMessage::UiSettingsResponse(m) => encode_ui_settings(writer, m),
            ControlMessage::SetAppLanguage(m) => {
                writer.write_str(&m.application_id);
                writer.write_str(&m.locale);
            }
            ControlMessage::SetDeviceOrientation(value)
            | ControlMessage::StopVideoStream(value)
            | ControlMessage::DisplayConfigurationRequest(value)
            | ControlMessage::DisplayAdded(value)
            | ControlMessage::DisplayRemoved(value)
            | ControlMessage::UiSettingsRequest(value)
            | ControlMessage::SetFontSize(value)
            | ControlMessage::SetScreenDensity(value) => writer.write_i32(*value),
            ControlMessage::SetDarkMode(flag)
            | ControlMessage::SetTalkBack(flag)
            | ControlMessage::SetSelectToSpeak(flag)
            | ControlMessage::SetGestureNavigation(flag) => writer.write_bool(*flag),
        }
    }

    /// Reads the kind tag and then the rest of the message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownKind`] for a kind outside the catalogue.
    pub fn read<R: Read>(reader: &mut Base128Reader<R>) -> Result<Self, ProtocolError> {
        let raw_kind = reader.read_u32()?;
        let kind = MessageKind::try_from(raw_kind).map_err(|_| ProtocolError::UnknownKind(raw_kind))?;
        Self::read_from(kind, reader)
    }

    /// Reads the fields of a message whose kind tag has already been consumed.
    pub fn read_from<R: Read>(
        kind: MessageKind,
        reader: &mut Base128Reader<R>,
    ) -> Result<Self, ProtocolError> {
        let msg = match kind {
            MessageKind::MotionEvent => ControlMessage::MotionEvent(decode_motion_event(reader)?),
            MessageKind::KeyEvent => ControlMessage::KeyEvent(KeyEventMessage {
                action: reader.read_i32()?,
                keycode: reader.read_i32()?,
                meta_state: reader.read_u32()?,
            }),
            MessageKind::TextInput => {
                let text = reader.read_utf16()?;
                if text.is_empty() {
                    return Err(ProtocolError::Malformed("empty text input".to_string()));
                }
                ControlMessage::TextInput(text)
            }
            MessageKind::SetDeviceOrientation => {
                ControlMessage::SetDeviceOrientation(reader.read_i32()?)
            }
            MessageKind::SetMaxVideoResolution => {
                ControlMessage::SetMaxVideoResolution(decode_video_resolution(reader)?)
            }
            MessageKind::StartVideoStream => {
                ControlMessage::StartVideoStream(decode_video_resolution(reader)?)
            }
            MessageKind::StopVideoStream => ControlMessage::StopVideoStream(reader.read_i32()?),
            MessageKind::StartClipboardSync => {
                ControlMessage::StartClipboardSync(StartClipboardSyncMessage {
                    max_synced_length: reader.read_i32()?,
                    text: reader.read_string()?,
                })
            }
            MessageKind::StopClipboardSync => ControlMessage::StopClipboardSync,
            MessageKind::RequestDeviceState => {
                ControlMessage::RequestDeviceState(reader.read_i32()?.wrapping_sub(1))
            }
            MessageKind::ClipboardChanged => ControlMessage::ClipboardChanged(reader.read_string()?),
            MessageKind::SupportedDeviceStates => {
                ControlMessage::SupportedDeviceStates(reader.read_string()?)
            }
            MessageKind::DeviceStateChanged => {
                ControlMessage::DeviceStateChanged(reader.read_i32()?.wrapping_sub(1))
            }
            MessageKind::DisplayConfigurationRequest => {
                ControlMessage::DisplayConfigurationRequest(reader.read_i32()?)
            }
            MessageKind::DisplayConfigurationResponse => {
                ControlMessage::DisplayConfigurationResponse(decode_display_configuration(reader)?)
            }
            MessageKind::DisplayAdded => ControlMessage::DisplayAdded(reader.read_i32()?),
            MessageKind::DisplayRemoved => ControlMessage::DisplayRemoved(reader.read_i32()?),
            MessageKind::ErrorResponse => ControlMessage::ErrorResponse(ErrorResponseMessage {
                request_id: reader.read_i32()?,
                message: reader.read_string()?,
            }),
            MessageKind::UiSettingsRequest => ControlMessage::UiSettingsRequest(reader.read_i32()?),
            MessageKind::UiSettingsResponse => {
                ControlMessage::UiSettingsResponse(decode_ui_settings(reader)?)
            }
            MessageKind::SetDarkMode => ControlMessage::SetDarkMode(reader.read_bool()?),
            MessageKind::SetFontSize => ControlMessage::SetFontSize(reader.read_i32()?),
            MessageKind::SetScreenDensity => ControlMessage::SetScreenDensity(reader.read_i32()?),
            MessageKind::SetTalkBack => ControlMessage::SetTalkBack(reader.read_bool()?),
            MessageKind::SetSelectToSpeak => ControlMessage::SetSelectToSpeak(reader.read_bool()?),
            MessageKind::SetAppLanguage => ControlMessage::SetAppLanguage(SetAppLanguageMessage {
                application_id: reader.read_string()?,
                locale: reader.read_string()?,
            }),
            MessageKind::SetGestureNavigation => {
                ControlMessage::SetGestureNavigation(reader.read_bool()?)
            }
        };
        Ok(msg)
    }
}

// ── Motion events ─────────────────────────────────────────────────────────────

fn encode_motion_event(writer: &mut Base128Writer, m: &MotionEventMessage) {
    writer.write_u32(m.pointers.len() as u32);
    for pointer in &m.pointers {
        writer.write_i32(pointer.x);
        writer.write_i32(pointer.y);
        writer.write_i32(pointer.pointer_id);
        writer.write_u32(pointer.axis_values.len() as u32);
        for (&axis, &value) in &pointer.axis_values {
            writer.write_i32(axis);
            writer.write_f32(value);
        }
    }
    writer.write_i32(m.action);
    writer.write_i32(m.button_state);
    writer.write_i32(m.action_button);
    writer.write_i32(m.display_id);
}

fn decode_motion_event<R: Read>(
    reader: &mut Base128Reader<R>,
) -> Result<MotionEventMessage, ProtocolError> {
    let count = reader.read_u32()? as usize;
    let mut pointers = Vec::with_capacity(count.min(MAX_POINTERS));
    // Every pointer present on the wire must be consumed to keep the framing
    // intact, even the ones that are dropped.
    for _ in 0..count {
        let mut pointer = Pointer {
            x: reader.read_i32()?,
            y: reader.read_i32()?,
            pointer_id: reader.read_i32()?,
            ..Pointer::default()
        };
        let axis_count = reader.read_u32()?;
        for _ in 0..axis_count {
            let axis = reader.read_i32()?;
            let value = reader.read_f32()?;
            pointer.axis_values.insert(axis, value);
        }
        if pointers.len() < MAX_POINTERS {
            pointers.push(pointer);
        }
    }
    if count > MAX_POINTERS {
        warn!("motion event with {count} pointers truncated to {MAX_POINTERS}");
    }
    Ok(MotionEventMessage {
        pointers,
        action: reader.read_i32()?,
        button_state: reader.read_i32()?,
        action_button: reader.read_i32()?,
        display_id: reader.read_i32()?,
    })
}

// ── Display messages ──────────────────────────────────────────────────────────

fn decode_video_resolution<R: Read>(
    reader: &mut Base128Reader<R>,
) -> Result<VideoResolutionMessage, ProtocolError> {
    let display_id = reader.read_i32()?;
    let width = reader.read_i32()?;
    let height = reader.read_i32()?;
    Ok(VideoResolutionMessage {
        display_id,
        max_size: Size::new(width, height),
    })
}

fn decode_display_configuration<R: Read>(
    reader: &mut Base128Reader<R>,
) -> Result<DisplayConfigurationResponseMessage, ProtocolError> {
    let request_id = reader.read_i32()?;
    let count = reader.read_u32()? as usize;
    let mut displays = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let display_id = reader.read_i32()?;
        let width = reader.read_i32()?;
        let height = reader.read_i32()?;
        displays.push(DisplayDescriptor {
            display_id,
            logical_size: Size::new(width, height),
            rotation: reader.read_i32()?,
            display_type: reader.read_i32()?,
        });
    }
    Ok(DisplayConfigurationResponseMessage {
        request_id,
        displays,
    })
}

// ── UI settings ───────────────────────────────────────────────────────────────

fn encode_ui_settings(writer: &mut Base128Writer, m: &UiSettingsResponseMessage) {
    let s = &m.settings;
    writer.write_i32(m.request_id);
    writer.write_bool(s.dark_mode);
    writer.write_bool(s.gesture_overlay_installed);
    writer.write_bool(s.gesture_navigation);
    writer.write_str(&s.foreground_application_id);
    writer.write_str(&s.app_locale);
    writer.write_bool(s.talkback_installed);
    writer.write_bool(s.talkback_on);
    writer.write_bool(s.select_to_speak_on);
    writer.write_bool(s.font_size_settable);
    writer.write_i32(s.font_size);
    writer.write_bool(s.density_settable);
    writer.write_i32(s.density);
}

fn decode_ui_settings<R: Read>(
    reader: &mut Base128Reader<R>,
) -> Result<UiSettingsResponseMessage, ProtocolError> {
    let request_id = reader.read_i32()?;
    let settings = UiSettingsSnapshot {
        dark_mode: reader.read_bool()?,
        gesture_overlay_installed: reader.read_bool()?,
        gesture_navigation: reader.read_bool()?,
        foreground_application_id: reader.read_string()?,
        app_locale: reader.read_string()?,
        talkback_installed: reader.read_bool()?,
        talkback_on: reader.read_bool()?,
        select_to_speak_on: reader.read_bool()?,
        font_size_settable: reader.read_bool()?,
        font_size: reader.read_i32()?,
        density_settable: reader.read_bool()?,
        density: reader.read_i32()?,
    };
    Ok(UiSettingsResponseMessage {
        request_id,
        settings,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn round_trip(msg: ControlMessage) -> ControlMessage {
        let bytes = encode_message(&msg);
        let (decoded, consumed) = decode_message(&bytes).expect("decode must succeed");
        assert_eq!(consumed, bytes.len(), "consumed bytes must equal encoded length");
        decoded
    }

    fn pointer(x: i32, y: i32, pointer_id: i32) -> Pointer {
        Pointer {
            x,
            y,
            pointer_id,
            axis_values: BTreeMap::new(),
        }
    }

    // ── Key events ────────────────────────────────────────────────────────────

    #[test]
    fn test_key_event_wire_bytes() {
        // Arrange
        let msg = ControlMessage::KeyEvent(KeyEventMessage {
            action: 0,
            keycode: 29,
            meta_state: 0x1000,
        });

        // Act
        let bytes = encode_message(&msg);

        // Assert: kind, action, keycode, meta_state (0x1000 = 0x80 0x20)
        assert_eq!(bytes, vec![2, 0, 29, 0x80, 0x20]);
    }

    // ── Motion events ─────────────────────────────────────────────────────────

    #[test]
    fn test_motion_event_with_axis_values_round_trip() {
        // Arrange
        let mut p = pointer(100, 200, 0);
        p.axis_values.insert(9, -1.5);
        p.axis_values.insert(10, 0.25);
        let msg = ControlMessage::MotionEvent(MotionEventMessage {
            pointers: vec![p],
            action: 8,
            button_state: 0,
            action_button: 0,
            display_id: 0,
        });

        // Act / Assert
        assert_eq!(round_trip(msg.clone()), msg);
    }

    #[test]
    fn test_motion_event_extra_pointers_are_drained_and_dropped() {
        // Arrange: three pointers on the wire followed by a second message.
        let mut bytes = encode_message(&ControlMessage::MotionEvent(MotionEventMessage {
            pointers: vec![pointer(1, 1, 0), pointer(2, 2, 1), pointer(3, 3, 2)],
            action: 2,
            button_state: 0,
            action_button: 0,
            display_id: 4,
        }));
        let first_len = bytes.len();
        bytes.extend(encode_message(&ControlMessage::StopClipboardSync));

        // Act
        let (decoded, consumed) = decode_message(&bytes).unwrap();

        // Assert
        assert_eq!(consumed, first_len);
        match decoded {
            ControlMessage::MotionEvent(m) => {
                assert_eq!(m.pointers, vec![pointer(1, 1, 0), pointer(2, 2, 1)]);
                assert_eq!(m.display_id, 4);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        let (next, _) = decode_message(&bytes[consumed..]).unwrap();
        assert_eq!(next, ControlMessage::StopClipboardSync);
    }

    // ── Text ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_text_input_uses_utf16_units() {
        // Arrange: U+1F600 is a surrogate pair.
        let msg = ControlMessage::TextInput("a\u{1F600}".to_string());

        // Act
        let bytes = encode_message(&msg);

        // Assert: kind 3, three code units, 'a', 0xD83D, 0xDE00
        assert_eq!(bytes[0], 3);
        assert_eq!(bytes[1], 3);
        assert_eq!(bytes[2], b'a');
        assert_eq!(round_trip(msg.clone()), msg);
    }

    #[test]
    fn test_empty_text_input_is_malformed() {
        let result = decode_message(&[3, 0]);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        // ClipboardChanged with a two-byte payload that is not UTF-8.
        let result = decode_message(&[11, 2, 0xC3, 0x28]);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    // ── Device state ──────────────────────────────────────────────────────────

    #[test]
    fn test_physical_device_state_is_single_zero_byte() {
        let bytes = encode_message(&ControlMessage::RequestDeviceState(-1));
        assert_eq!(bytes, vec![10, 0]);
    }

    #[test]
    fn test_device_state_changed_is_shifted_by_one() {
        let bytes = encode_message(&ControlMessage::DeviceStateChanged(2));
        assert_eq!(bytes, vec![13, 3]);
        assert_eq!(round_trip(ControlMessage::DeviceStateChanged(2)), ControlMessage::DeviceStateChanged(2));
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = decode_message(&[0x63]);
        assert!(matches!(result, Err(ProtocolError::UnknownKind(0x63))));
    }

    #[test]
    fn test_truncated_message_is_end_of_stream() {
        // Arrange
        let bytes = encode_message(&ControlMessage::StartVideoStream(VideoResolutionMessage {
            display_id: 0,
            max_size: Size::new(1280, 720),
        }));

        // Act
        let result = decode_message(&bytes[..bytes.len() - 1]);

        // Assert
        assert!(result.unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_empty_input_is_end_of_stream() {
        assert!(decode_message(&[]).unwrap_err().is_end_of_stream());
    }
}
