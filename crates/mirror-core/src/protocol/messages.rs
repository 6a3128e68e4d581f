//! All control channel message types.
//!
//! Every message on the wire is a varint kind tag followed by the fields of
//! that kind, in the order the structs below declare them.  Field order is
//! append-only: new fields may be added at the end of a message, existing
//! fields are never reordered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::geometry::Size;

// ── Protocol constants ────────────────────────────────────────────────────────

/// First byte written on a freshly opened control socket.
pub const CHANNEL_MARKER: u8 = b'C';

/// Maximum number of pointers kept from a single motion message.
pub const MAX_POINTERS: usize = 2;

/// Device state value meaning "follow the physical posture of the device".
pub const PHYSICAL_DEVICE_STATE: i32 = -1;

// ── Message kind codes ────────────────────────────────────────────────────────

/// Kind tags of the message catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MessageKind {
    // Controller -> device
    MotionEvent = 1,
    KeyEvent = 2,
    TextInput = 3,
    SetDeviceOrientation = 4,
    SetMaxVideoResolution = 5,
    StartVideoStream = 6,
    StopVideoStream = 7,
    StartClipboardSync = 8,
    StopClipboardSync = 9,
    RequestDeviceState = 10,
    // Device -> controller
    ClipboardChanged = 11,
    SupportedDeviceStates = 12,
    DeviceStateChanged = 13,
    // Display configuration
    DisplayConfigurationRequest = 14,
    DisplayConfigurationResponse = 15,
    DisplayAdded = 16,
    DisplayRemoved = 17,
    ErrorResponse = 18,
    // UI settings
    UiSettingsRequest = 19,
    UiSettingsResponse = 20,
    SetDarkMode = 21,
    SetFontSize = 22,
    SetScreenDensity = 23,
    SetTalkBack = 24,
    SetSelectToSpeak = 25,
    SetAppLanguage = 26,
    SetGestureNavigation = 27,
}

impl TryFrom<u32> for MessageKind {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            1 => Ok(MessageKind::MotionEvent),
            2 => Ok(MessageKind::KeyEvent),
            3 => Ok(MessageKind::TextInput),
            4 => Ok(MessageKind::SetDeviceOrientation),
            5 => Ok(MessageKind::SetMaxVideoResolution),
            6 => Ok(MessageKind::StartVideoStream),
            7 => Ok(MessageKind::StopVideoStream),
            8 => Ok(MessageKind::StartClipboardSync),
            9 => Ok(MessageKind::StopClipboardSync),
            10 => Ok(MessageKind::RequestDeviceState),
            11 => Ok(MessageKind::ClipboardChanged),
            12 => Ok(MessageKind::SupportedDeviceStates),
            13 => Ok(MessageKind::DeviceStateChanged),
            14 => Ok(MessageKind::DisplayConfigurationRequest),
            15 => Ok(MessageKind::DisplayConfigurationResponse),
            16 => Ok(MessageKind::DisplayAdded),
            17 => Ok(MessageKind::DisplayRemoved),
            18 => Ok(MessageKind::ErrorResponse),
            19 => Ok(MessageKind::UiSettingsRequest),
            20 => Ok(MessageKind::UiSettingsResponse),
            21 => Ok(MessageKind::SetDarkMode),
            22 => Ok(MessageKind::SetFontSize),
            23 => Ok(MessageKind::SetScreenDensity),
            24 => Ok(MessageKind::SetTalkBack),
            25 => Ok(MessageKind::SetSelectToSpeak),
            26 => Ok(MessageKind::SetAppLanguage),
            27 => Ok(MessageKind::SetGestureNavigation),
            _ => Err(()),
        }
    }
}

impl MessageKind {
    /// Returns `true` for kinds that only the device sends.
    pub fn is_outbound(self) -> bool {
        matches!(
            self,
            MessageKind::ClipboardChanged
                | MessageKind::SupportedDeviceStates
                | MessageKind::DeviceStateChanged
                | MessageKind::DisplayConfigurationResponse
                | MessageKind::DisplayAdded
                | MessageKind::DisplayRemoved
                | MessageKind::ErrorResponse
                | MessageKind::UiSettingsResponse
        )
    }
}

// ── Input messages ────────────────────────────────────────────────────────────

/// One pointer (finger, stylus tip, or mouse cursor) of a motion message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pointer {
    /// Horizontal coordinate in natural display orientation.
    pub x: i32,
    /// Vertical coordinate in natural display orientation.
    pub y: i32,
    pub pointer_id: i32,
    /// Extra axis values (scroll deltas, tilt, ...) keyed by platform axis id.
    pub axis_values: BTreeMap<i32, f32>,
}

/// A touch, stylus, or mouse event on one display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEventMessage {
    /// Pointers ordered by ascending id; never more than [`MAX_POINTERS`].
    pub pointers: Vec<Pointer>,
    /// Platform motion action, optionally carrying a pointer index in bits 8..16.
    pub action: i32,
    pub button_state: i32,
    pub action_button: i32,
    pub display_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEventMessage {
    /// Platform key action (down, up, or down-and-up).
    pub action: i32,
    pub keycode: i32,
    pub meta_state: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResolutionMessage {
    pub display_id: i32,
    pub max_size: Size,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartClipboardSyncMessage {
    /// Longest clipboard text, in characters, the controller wants to receive.
    /// Zero or less disables change notifications.
    pub max_synced_length: i32,
    /// Text to place on the device clipboard.
    pub text: String,
}

// ── Display configuration ─────────────────────────────────────────────────────

/// One display as reported to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    pub display_id: i32,
    /// Size in the display's current orientation.
    pub logical_size: Size,
    /// Rotation in quarter turns.
    pub rotation: i32,
    pub display_type: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfigurationResponseMessage {
    pub request_id: i32,
    pub displays: Vec<DisplayDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponseMessage {
    pub request_id: i32,
    pub message: String,
}

// ── UI settings ───────────────────────────────────────────────────────────────

/// Accessibility and appearance settings reported to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiSettingsSnapshot {
    pub dark_mode: bool,
    pub gesture_overlay_installed: bool,
    pub gesture_navigation: bool,
    pub foreground_application_id: String,
    pub app_locale: String,
    pub talkback_installed: bool,
    pub talkback_on: bool,
    pub select_to_speak_on: bool,
    pub font_size_settable: bool,
    pub font_size: i32,
    pub density_settable: bool,
    pub density: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettingsResponseMessage {
    pub request_id: i32,
    pub settings: UiSettingsSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAppLanguageMessage {
    pub application_id: String,
    pub locale: String,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// Every message that can travel over the control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    MotionEvent(MotionEventMessage),
    KeyEvent(KeyEventMessage),
    /// Text typed by the user; must not be empty.
    TextInput(String),
    /// Device orientation in quarter turns, `0..=3`.
    SetDeviceOrientation(i32),
    SetMaxVideoResolution(VideoResolutionMessage),
    StartVideoStream(VideoResolutionMessage),
    StopVideoStream(i32),
    StartClipboardSync(StartClipboardSyncMessage),
    StopClipboardSync,
    /// Requested device state, or [`PHYSICAL_DEVICE_STATE`].
    RequestDeviceState(i32),
    ClipboardChanged(String),
    /// Textual description of the supported device states.
    SupportedDeviceStates(String),
    DeviceStateChanged(i32),
    DisplayConfigurationRequest(i32),
    DisplayConfigurationResponse(DisplayConfigurationResponseMessage),
    DisplayAdded(i32),
    DisplayRemoved(i32),
    ErrorResponse(ErrorResponseMessage),
    UiSettingsRequest(i32),
    UiSettingsResponse(UiSettingsResponseMessage),
    SetDarkMode(bool),
    SetFontSize(i32),
    SetScreenDensity(i32),
    SetTalkBack(bool),
    SetSelectToSpeak(bool),
    SetAppLanguage(SetAppLanguageMessage),
    SetGestureNavigation(bool),
}

impl ControlMessage {
    /// Returns the kind tag written in front of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            ControlMessage::MotionEvent(_) => MessageKind::MotionEvent,
            ControlMessage::KeyEvent(_) => MessageKind::KeyEvent,
            ControlMessage::TextInput(_) => MessageKind::TextInput,
            ControlMessage::SetDeviceOrientation(_) => MessageKind::SetDeviceOrientation,
            ControlMessage::SetMaxVideoResolution(_) => MessageKind::SetMaxVideoResolution,
            ControlMessage::StartVideoStream(_) => MessageKind::StartVideoStream,
            ControlMessage::StopVideoStream(_) => MessageKind::StopVideoStream,
            ControlMessage::StartClipboardSync(_) => MessageKind::StartClipboardSync,
            ControlMessage::StopClipboardSync => MessageKind::StopClipboardSync,
            ControlMessage::RequestDeviceState(_) => MessageKind::RequestDeviceState,
            ControlMessage::ClipboardChanged(_) => MessageKind::ClipboardChanged,
            ControlMessage::SupportedDeviceStates(_) => MessageKind::SupportedDeviceStates,
            ControlMessage::DeviceStateChanged(_) => MessageKind::DeviceStateChanged,
            ControlMessage::DisplayConfigurationRequest(_) => {
                MessageKind::DisplayConfigurationRequest
            }
            ControlMessage::DisplayConfigurationResponse(_) => {
                MessageKind::DisplayConfigurationResponse
            }
            ControlMessage::DisplayAdded(_) => MessageKind::DisplayAdded,
            ControlMessage::DisplayRemoved(_) => MessageKind::DisplayRemoved,
            ControlMessage::ErrorResponse(_) => MessageKind::ErrorResponse,
            ControlMessage::UiSettingsRequest(_) => MessageKind::UiSettingsRequest,
            ControlMessage::UiSettingsResponse(_) => MessageKind::UiSettingsResponse,
            ControlMessage::SetDarkMode(_) => MessageKind::SetDarkMode,
            ControlMessage::SetFontSize(_) => MessageKind::SetFontSize,
            ControlMessage::SetScreenDensity(_) => MessageKind::SetScreenDensity,
            ControlMessage::SetTalkBack(_) => MessageKind::SetTalkBack,
            ControlMessage::SetSelectToSpeak(_) => MessageKind::SetSelectToSpeak,
            ControlMessage::SetAppLanguage(_) => MessageKind::SetAppLanguage,
            ControlMessage::SetGestureNavigation(_) => MessageKind::SetGestureNavigation,
        }
    }
}
