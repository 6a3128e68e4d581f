//! Collaborator contracts consumed by the session controller.
//!
//! Each platform service the agent talks to (input injection, device posture,
//! clipboard, display enumeration, video streaming, UI settings) is reached
//! through one of the traits below.  Implementations live in the
//! infrastructure layer; the session controller only ever sees
//! `Arc<dyn Trait>` values bundled in [`Capabilities`].
//!
//! Change notifications flow the other way: the controller registers a
//! listener object with the service, and the service calls it from whatever
//! thread it likes.  Listeners are identified by pointer, so removing a
//! listener requires passing the same `Arc` that was added.

use std::collections::BTreeMap;
use std::sync::Arc;

use mirror_core::protocol::messages::UiSettingsSnapshot;
use mirror_core::{DisplayInfo, Rotation, Size};
use thiserror::Error;

/// Error type for collaborator operations.
///
/// These never end a session: the handler that triggered the call logs the
/// error and moves on to the next message.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),
    #[error("platform error: {0}")]
    Platform(String),
}

// ── Input events ──────────────────────────────────────────────────────────────

/// How long the injector should wait for the injected event to be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectionSync {
    #[default]
    None,
    WaitForResult,
    WaitForFinish,
}

/// One pointer of a [`MotionEvent`], in rotated display coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerSample {
    pub pointer_id: i32,
    pub x: i32,
    pub y: i32,
    /// `0.0` for a pointer that is being lifted, `1.0` otherwise.
    pub pressure: f32,
    pub axis_values: BTreeMap<i32, f32>,
}

/// A fully formed motion event ready for injection.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionEvent {
    pub display_id: i32,
    pub action: i32,
    pub action_button: i32,
    pub button_state: i32,
    pub source: i32,
    /// Time the current gesture started; `0` for hover and scroll events.
    pub down_time_millis: i64,
    pub event_time_millis: i64,
    pub pointers: Vec<PointerSample>,
}

/// A fully formed key event ready for injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: i32,
    pub keycode: i32,
    pub meta_state: u32,
    pub device_id: i32,
    pub source: i32,
    pub down_time_millis: i64,
    pub event_time_millis: i64,
}

pub trait InputInjector: Send + Sync {
    fn inject_motion(&self, event: &MotionEvent, sync: InjectionSync) -> Result<(), CapabilityError>;

    fn inject_key(&self, event: &KeyEvent, sync: InjectionSync) -> Result<(), CapabilityError>;

    /// Returns the key events that type the UTF-16 code unit `unit` on the
    /// virtual keyboard, or `None` if no key combination produces it.
    fn key_events_for_char(&self, unit: u16) -> Option<Vec<KeyEvent>>;
}

// ── Listeners ─────────────────────────────────────────────────────────────────

pub trait ClipboardListener: Send + Sync {
    fn on_primary_clip_changed(&self);
}

pub trait DeviceStateListener: Send + Sync {
    fn on_device_state_changed(&self, state: i32);
}

pub trait DisplayListener: Send + Sync {
    fn on_display_added(&self, display_id: i32);
    fn on_display_removed(&self, display_id: i32);
    fn on_display_changed(&self, display_id: i32);
}

/// Returns `true` if both handles point at the same listener object.
pub fn same_listener<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

// ── Services ──────────────────────────────────────────────────────────────────

/// Foldable posture access.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceStateProvider: Send + Sync {
    /// Textual description of every supported state, one `DeviceState{...}`
    /// entry per state.
    fn supported_states(&self) -> Result<String, CapabilityError>;

    fn state(&self) -> Result<i32, CapabilityError>;

    fn request_state(&self, state: i32, flags: i32) -> Result<(), CapabilityError>;

    fn add_listener(&self, listener: Arc<dyn DeviceStateListener>);

    fn remove_listener(&self, listener: &Arc<dyn DeviceStateListener>);
}

pub trait ClipboardService: Send + Sync {
    fn text(&self) -> Result<String, CapabilityError>;

    fn set_text(&self, text: &str) -> Result<(), CapabilityError>;

    fn add_listener(&self, listener: Arc<dyn ClipboardListener>);

    fn remove_listener(&self, listener: &Arc<dyn ClipboardListener>);
}

pub trait DisplayRegistry: Send + Sync {
    fn display_ids(&self) -> Result<Vec<i32>, CapabilityError>;

    /// Returns `None` for a display that does not exist (any more).
    fn display_info(&self, display_id: i32) -> Option<DisplayInfo>;

    fn add_listener(&self, listener: Arc<dyn DisplayListener>);

    fn remove_listener(&self, listener: &Arc<dyn DisplayListener>);
}

/// Orientation requested from the video streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOrientation {
    /// Lock the video to the given rotation.
    Fixed(Rotation),
    /// Re-derive from the orientation of the foreground application.
    CurrentVideo,
    /// Re-derive from the current display rotation.
    CurrentDisplay,
}

#[cfg_attr(test, mockall::automock)]
pub trait VideoStreamer: Send + Sync {
    fn start(&self, display_id: i32, max_size: Size) -> Result<(), CapabilityError>;

    fn stop(&self, display_id: i32) -> Result<(), CapabilityError>;

    fn set_orientation(&self, display_id: i32, orientation: VideoOrientation);

    fn set_max_resolution(&self, display_id: i32, max_size: Size);
}

/// Pass-through access to the device's appearance and accessibility settings.
pub trait UiSettingsStore: Send + Sync {
    fn snapshot(&self) -> UiSettingsSnapshot;
    fn set_dark_mode(&self, on: bool);
    fn set_font_size(&self, font_size: i32);
    fn set_screen_density(&self, density: i32);
    fn set_talkback(&self, on: bool);
    fn set_select_to_speak(&self, on: bool);
    fn set_app_language(&self, application_id: &str, locale: &str);
    fn set_gesture_navigation(&self, on: bool);
    /// Restores every setting changed during the session.
    fn reset(&self);
}

/// Every collaborator one session needs.
#[derive(Clone)]
pub struct Capabilities {
    pub input: Arc<dyn InputInjector>,
    pub device_state: Arc<dyn DeviceStateProvider>,
    pub clipboard: Arc<dyn ClipboardService>,
    pub displays: Arc<dyn DisplayRegistry>,
    pub video: Arc<dyn VideoStreamer>,
    pub ui_settings: Arc<dyn UiSettingsStore>,
}
