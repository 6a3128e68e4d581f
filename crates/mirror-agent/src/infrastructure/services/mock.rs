//! In-memory device services.
//!
//! Each fake records what the agent asked of it and exposes `simulate_*`
//! helpers that fire listener callbacks the way the platform would, from the
//! calling thread.  [`FakeDevice`] bundles one of each into a
//! [`Capabilities`] value.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mirror_core::protocol::messages::UiSettingsSnapshot;
use mirror_core::{DisplayInfo, Rotation, Size};

use super::ListenerSet;
use crate::application::capabilities::{
    CapabilityError, Capabilities, ClipboardListener, ClipboardService, DeviceStateListener,
    DeviceStateProvider, DisplayListener, DisplayRegistry, UiSettingsStore, VideoOrientation,
    VideoStreamer,
};
use crate::infrastructure::input_injection::mock::{record_bounded, RecordingInputInjector};

// ── Clipboard ─────────────────────────────────────────────────────────────────

/// Clipboard that notifies listeners on every write, including the agent's own.
#[derive(Default)]
pub struct FakeClipboard {
    text: Mutex<String>,
    /// Every text the agent placed on the clipboard.
    pub pushed: Mutex<Vec<String>>,
    listeners: ListenerSet<dyn ClipboardListener>,
}

impl FakeClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the clipboard content as a device application would.
    pub fn simulate_change(&self, text: &str) {
        *self.text.lock().expect("lock poisoned") = text.to_string();
        self.listeners.notify(|l| l.on_primary_clip_changed());
    }

    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().expect("lock poisoned").clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ClipboardService for FakeClipboard {
    fn text(&self) -> Result<String, CapabilityError> {
        Ok(self.text.lock().expect("lock poisoned").clone())
    }

    fn set_text(&self, text: &str) -> Result<(), CapabilityError> {
        self.pushed.lock().expect("lock poisoned").push(text.to_string());
        self.simulate_change(text);
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn ClipboardListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn ClipboardListener>) {
        self.listeners.remove(listener);
    }
}

// ── Device states ─────────────────────────────────────────────────────────────

pub struct FakeDeviceStates {
    supported: String,
    state: AtomicI32,
    /// `(state, flags)` of every state request.
    pub requests: Mutex<Vec<(i32, i32)>>,
    listeners: ListenerSet<dyn DeviceStateListener>,
}

impl FakeDeviceStates {
    /// A device with the given supported-states text, currently in `state`.
    pub fn new(supported: impl Into<String>, state: i32) -> Self {
        Self {
            supported: supported.into(),
            state: AtomicI32::new(state),
            requests: Mutex::new(Vec::new()),
            listeners: ListenerSet::new(),
        }
    }

    /// A foldable with a closed (0) and an open (1) posture.
    pub fn foldable(state: i32) -> Self {
        Self::new(
            "DeviceState{identifier=0, name='CLOSE'}, DeviceState{identifier=1, name='OPEN'}",
            state,
        )
    }

    /// A device with one posture only.
    pub fn single_state() -> Self {
        Self::new("DeviceState{identifier=0, name='DEFAULT'}", 0)
    }

    pub fn simulate_state(&self, state: i32) {
        self.state.store(state, Ordering::SeqCst);
        self.listeners.notify(|l| l.on_device_state_changed(state));
    }

    pub fn requests(&self) -> Vec<(i32, i32)> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl DeviceStateProvider for FakeDeviceStates {
    fn supported_states(&self) -> Result<String, CapabilityError> {
        Ok(self.supported.clone())
    }

    fn state(&self) -> Result<i32, CapabilityError> {
        Ok(self.state.load(Ordering::SeqCst))
    }

    fn request_state(&self, state: i32, flags: i32) -> Result<(), CapabilityError> {
        self.requests.lock().expect("lock poisoned").push((state, flags));
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn DeviceStateListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn DeviceStateListener>) {
        self.listeners.remove(listener);
    }
}

// ── Displays ──────────────────────────────────────────────────────────────────

pub struct FakeDisplays {
    displays: Mutex<BTreeMap<i32, DisplayInfo>>,
    /// When set, listing displays fails.
    pub fail_listing: AtomicBool,
    listeners: ListenerSet<dyn DisplayListener>,
}

impl FakeDisplays {
    /// Registry holding only `display_id` 0 with the given info.
    pub fn with_default_display(info: DisplayInfo) -> Self {
        Self {
            displays: Mutex::new(BTreeMap::from([(0, info)])),
            fail_listing: AtomicBool::new(false),
            listeners: ListenerSet::new(),
        }
    }

    /// Adds or replaces a display and reports it as added.
    pub fn attach(&self, display_id: i32, info: DisplayInfo) {
        self.displays
            .lock()
            .expect("lock poisoned")
            .insert(display_id, info);
        self.listeners.notify(|l| l.on_display_added(display_id));
    }

    /// Removes a display and reports it as removed.
    pub fn detach(&self, display_id: i32) {
        self.displays.lock().expect("lock poisoned").remove(&display_id);
        self.listeners.notify(|l| l.on_display_removed(display_id));
    }

    /// Replaces the info of an existing display without an add/remove event.
    pub fn update(&self, display_id: i32, info: DisplayInfo) {
        self.displays
            .lock()
            .expect("lock poisoned")
            .insert(display_id, info);
        self.listeners.notify(|l| l.on_display_changed(display_id));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl DisplayRegistry for FakeDisplays {
    fn display_ids(&self) -> Result<Vec<i32>, CapabilityError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(CapabilityError::Platform("display service unavailable".to_string()));
        }
        Ok(self.displays.lock().expect("lock poisoned").keys().copied().collect())
    }

    fn display_info(&self, display_id: i32) -> Option<DisplayInfo> {
        self.displays
            .lock()
            .expect("lock poisoned")
            .get(&display_id)
            .copied()
    }

    fn add_listener(&self, listener: Arc<dyn DisplayListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn DisplayListener>) {
        self.listeners.remove(listener);
    }
}

// ── Video ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCall {
    Start(i32, Size),
    Stop(i32),
    Orientation(i32, VideoOrientation),
    MaxResolution(i32, Size),
}

#[derive(Debug, Default)]
pub struct RecordingVideoStreamer {
    pub calls: Mutex<Vec<VideoCall>>,
}

impl RecordingVideoStreamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<VideoCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    fn record(&self, call: VideoCall) {
        record_bounded(&self.calls, call);
    }
}

impl VideoStreamer for RecordingVideoStreamer {
    fn start(&self, display_id: i32, max_size: Size) -> Result<(), CapabilityError> {
        self.record(VideoCall::Start(display_id, max_size));
        Ok(())
    }

    fn stop(&self, display_id: i32) -> Result<(), CapabilityError> {
        self.record(VideoCall::Stop(display_id));
        Ok(())
    }

    fn set_orientation(&self, display_id: i32, orientation: VideoOrientation) {
        self.record(VideoCall::Orientation(display_id, orientation));
    }

    fn set_max_resolution(&self, display_id: i32, max_size: Size) {
        self.record(VideoCall::MaxResolution(display_id, max_size));
    }
}

// ── UI settings ───────────────────────────────────────────────────────────────

/// Settings store that restores its initial snapshot on `reset`.
pub struct InMemoryUiSettings {
    initial: UiSettingsSnapshot,
    current: Mutex<UiSettingsSnapshot>,
    resets: AtomicUsize,
}

impl InMemoryUiSettings {
    pub fn new(initial: UiSettingsSnapshot) -> Self {
        Self {
            current: Mutex::new(initial.clone()),
            initial,
            resets: AtomicUsize::new(0),
        }
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn update(&self, f: impl FnOnce(&mut UiSettingsSnapshot)) {
        f(&mut self.current.lock().expect("lock poisoned"));
    }
}

impl Default for InMemoryUiSettings {
    fn default() -> Self {
        Self::new(UiSettingsSnapshot {
            app_locale: "en-US".to_string(),
            font_size_settable: true,
            font_size: 100,
            density_settable: true,
            density: 420,
            ..UiSettingsSnapshot::default()
        })
    }
}

impl UiSettingsStore for InMemoryUiSettings {
    fn snapshot(&self) -> UiSettingsSnapshot {
        self.current.lock().expect("lock poisoned").clone()
    }

    fn set_dark_mode(&self, on: bool) {
        self.update(|s| s.dark_mode = on);
    }

    fn set_font_size(&self, font_size: i32) {
        self.update(|s| s.font_size = font_size);
    }

    fn set_screen_density(&self, density: i32) {
        self.update(|s| s.density = density);
    }

    fn set_talkback(&self, on: bool) {
        self.update(|s| s.talkback_on = on);
    }

    fn set_select_to_speak(&self, on: bool) {
        self.update(|s| s.select_to_speak_on = on);
    }

    fn set_app_language(&self, application_id: &str, locale: &str) {
        self.update(|s| {
            s.foreground_application_id = application_id.to_string();
            s.app_locale = locale.to_string();
        });
    }

    fn set_gesture_navigation(&self, on: bool) {
        self.update(|s| s.gesture_navigation = on);
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().expect("lock poisoned") = self.initial.clone();
    }
}

// ── Bundle ────────────────────────────────────────────────────────────────────

/// One fake of every service, shared with the session through [`Capabilities`].
pub struct FakeDevice {
    pub input: Arc<RecordingInputInjector>,
    pub device_states: Arc<FakeDeviceStates>,
    pub clipboard: Arc<FakeClipboard>,
    pub displays: Arc<FakeDisplays>,
    pub video: Arc<RecordingVideoStreamer>,
    pub ui_settings: Arc<InMemoryUiSettings>,
}

impl FakeDevice {
    /// A single-posture phone with a 1080x2400 portrait screen that is on.
    pub fn phone() -> Self {
        Self::with_device_states(FakeDeviceStates::single_state())
    }

    /// A foldable in the given posture.
    pub fn foldable(state: i32) -> Self {
        Self::with_device_states(FakeDeviceStates::foldable(state))
    }

    fn with_device_states(device_states: FakeDeviceStates) -> Self {
        Self {
            input: Arc::new(RecordingInputInjector::new()),
            device_states: Arc::new(device_states),
            clipboard: Arc::new(FakeClipboard::new()),
            displays: Arc::new(FakeDisplays::with_default_display(DisplayInfo::new(
                Size::new(1080, 2400),
                Rotation::Deg0,
            ))),
            video: Arc::new(RecordingVideoStreamer::new()),
            ui_settings: Arc::new(InMemoryUiSettings::default()),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            input: self.input.clone(),
            device_state: self.device_states.clone(),
            clipboard: self.clipboard.clone(),
            displays: self.displays.clone(),
            video: self.video.clone(),
            ui_settings: self.ui_settings.clone(),
        }
    }
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self::phone()
    }
}
