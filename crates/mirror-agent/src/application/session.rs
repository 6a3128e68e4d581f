//! Session controller: one instance per accepted control connection.
//!
//! # Lifecycle
//!
//! ```text
//! Created --initialize()--> Initialized --run()--> Running --stop()--> Stopped
//! ```
//!
//! `initialize` registers the collaborator callbacks and performs first
//! contact (supported device states, optional wake-up).  `run` drives the
//! receive loop on the calling thread until the peer goes away, the session
//! is stopped, or a fatal error occurs.  `stop` may be called from any thread
//! through a [`StopHandle`]; it is idempotent and never interrupts a blocking
//! call in progress.
//!
//! # Receive loop
//!
//! Each iteration first emits due notifications (clipboard, posture, hotplug,
//! in that order), then waits up to the receive timeout for the first byte of
//! the next message.  Once a message has started, the timeout is cleared so
//! that a slow peer can never leave the stream positioned mid-message.
//! Messages that arrive after `stop` are still read in full, but are not
//! dispatched.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mirror_core::domain::display::DEFAULT_DISPLAY;
use mirror_core::domain::input::{key_action, keycode, motion_action, source, VIRTUAL_KEYBOARD};
use mirror_core::protocol::base128::Base128Reader;
use mirror_core::protocol::messages::{
    DisplayConfigurationResponseMessage, DisplayDescriptor, ErrorResponseMessage,
    KeyEventMessage, MotionEventMessage, StartClipboardSyncMessage, UiSettingsResponseMessage,
    VideoResolutionMessage, CHANNEL_MARKER,
};
use mirror_core::{encode_message, ControlMessage, MessageKind, ProtocolError, Rotation, Size};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::application::capabilities::{
    Capabilities, ClipboardListener, DeviceStateListener, DisplayListener, InjectionSync, KeyEvent,
    MotionEvent, VideoOrientation,
};
use crate::application::clipboard_sync::{ClipboardChangeFlag, ClipboardMirror, Subscription};
use crate::application::gesture::GestureTranslator;
use crate::application::hotplug::{DisplayEvent, DisplayPoller, HotplugQueue};
use crate::application::posture::{probe_supported_states, PostureWatcher};
use crate::transport::channel::{ControlChannel, SEND_TIMEOUT_SLICE};
use crate::transport::socket_writer::{SocketWriteError, SocketWriter, WriteResult};

/// Default time the loop waits for a message before checking notifications again.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(250);

/// Default time budget for delivering one outbound message.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fatal session errors.  The process is expected to exit after any of these.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer sent bytes that do not form a valid message.  Framing can no
    /// longer be trusted.
    #[error("invalid control message: {0}")]
    Protocol(ProtocolError),

    #[error(transparent)]
    Transport(#[from] SocketWriteError),

    #[error("control socket I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Io(source) => SessionError::Io(source),
            other => SessionError::Protocol(other),
        }
    }
}

/// Why a session ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection.
    EndOfStream,
    /// A write found the connection closed.
    Disconnected,
    /// The peer stopped reading and an outbound message could not be
    /// delivered within the write timeout.
    WriteTimedOut,
    /// The session was stopped and the peer went quiet.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Initialized,
    Running,
    Stopped,
}

/// Display polling settings used instead of display callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPolling {
    pub interval: Duration,
    /// Stop polling after this long; `None` polls for the whole session.
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub receive_timeout: Duration,
    pub write_timeout: Duration,
    /// Wake the device during initialization (set when video streams from the start).
    pub wake_on_initialize: bool,
    pub display_polling: Option<DisplayPolling>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            wake_on_initialize: false,
            display_polling: None,
        }
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

/// State reachable from collaborator callbacks and from [`StopHandle`].
struct Shared {
    stopped: AtomicBool,
    capabilities: Capabilities,
    clipboard_changes: Arc<ClipboardChangeFlag>,
    clipboard_registered: AtomicBool,
    posture: Arc<PostureWatcher>,
    posture_registered: AtomicBool,
    hotplug: Arc<HotplugQueue>,
    display_listener_registered: AtomicBool,
    poller: Mutex<Option<DisplayPoller>>,
}

impl Shared {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("stopping control session");
        self.release_callbacks();
        self.capabilities.ui_settings.reset();
    }

    fn subscribe_clipboard(&self) {
        if !self.clipboard_registered.swap(true, Ordering::AcqRel) {
            let listener: Arc<dyn ClipboardListener> = self.clipboard_changes.clone();
            self.capabilities.clipboard.add_listener(listener);
        }
    }

    fn unsubscribe_clipboard(&self) {
        if self.clipboard_registered.swap(false, Ordering::AcqRel) {
            let listener: Arc<dyn ClipboardListener> = self.clipboard_changes.clone();
            self.capabilities.clipboard.remove_listener(&listener);
        }
    }

    /// Unregisters every callback.  Each registration is released at most once.
    fn release_callbacks(&self) {
        self.unsubscribe_clipboard();
        if self.posture_registered.swap(false, Ordering::AcqRel) {
            let listener: Arc<dyn DeviceStateListener> = self.posture.clone();
            self.capabilities.device_state.remove_listener(&listener);
        }
        if self.display_listener_registered.swap(false, Ordering::AcqRel) {
            let listener: Arc<dyn DisplayListener> = self.hotplug.clone();
            self.capabilities.displays.remove_listener(&listener);
        }
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(mut poller) = poller {
            poller.stop();
        }
    }
}

/// Cloneable handle that stops a session from any thread.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

pub struct SessionController<C: ControlChannel> {
    reader: Base128Reader<C>,
    writer: SocketWriter<C>,
    config: SessionConfig,
    state: SessionState,
    gestures: GestureTranslator,
    clipboard: ClipboardMirror,
    shared: Arc<Shared>,
}

/// Result of an operation that may end the session gracefully.
type Step = Result<Option<SessionEnd>, SessionError>;

impl<C: ControlChannel> SessionController<C> {
    /// Takes ownership of a connected control socket and writes the channel
    /// marker to it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the socket cannot be configured or cloned,
    /// or if writing the marker fails fatally.
    pub fn new(
        channel: C,
        capabilities: Capabilities,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        channel.set_send_timeout(Some(SEND_TIMEOUT_SLICE))?;
        let reader = Base128Reader::new(channel.try_clone_channel()?);
        let mut writer = SocketWriter::new(channel, "control");

        let marker_result = writer.write(&[CHANNEL_MARKER], &[], config.write_timeout)?;
        if !matches!(
            marker_result,
            WriteResult::Success | WriteResult::SuccessAfterBlocking
        ) {
            warn!("could not write the control channel marker: {marker_result:?}");
        }

        let shared = Arc::new(Shared {
            stopped: AtomicBool::new(false),
            posture: Arc::new(PostureWatcher::new(Arc::clone(&capabilities.video))),
            capabilities,
            clipboard_changes: Arc::new(ClipboardChangeFlag::new()),
            clipboard_registered: AtomicBool::new(false),
            posture_registered: AtomicBool::new(false),
            hotplug: Arc::new(HotplugQueue::new()),
            display_listener_registered: AtomicBool::new(false),
            poller: Mutex::new(None),
        });

        Ok(Self {
            reader,
            writer,
            config,
            state: SessionState::Created,
            gestures: GestureTranslator::new(),
            clipboard: ClipboardMirror::new(),
            shared,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn state(&self) -> SessionState {
        if self.shared.is_stopped() {
            SessionState::Stopped
        } else {
            self.state
        }
    }

    fn capabilities(&self) -> &Capabilities {
        &self.shared.capabilities
    }

    /// Registers collaborator callbacks and performs first-contact setup.
    /// Calling it again, or after `stop`, does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if a display poller thread cannot be started
    /// or a write fails fatally.
    pub fn initialize(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Created || self.shared.is_stopped() {
            return Ok(());
        }

        if self.config.wake_on_initialize {
            self.wake_up_device();
        }

        match probe_supported_states(self.capabilities().device_state.as_ref()) {
            Ok(Some(states_text)) => {
                // A peer that already hung up is detected by the receive loop.
                self.send(&ControlMessage::SupportedDeviceStates(states_text))?;
                let listener: Arc<dyn DeviceStateListener> = self.shared.posture.clone();
                self.capabilities().device_state.add_listener(listener);
                self.shared.posture_registered.store(true, Ordering::Release);
                match self.capabilities().device_state.state() {
                    Ok(state) => {
                        debug!("initial device state {state}");
                        self.shared.posture.tracker().update(state);
                    }
                    Err(e) => warn!("could not read the device state: {e}"),
                }
            }
            Ok(None) => {}
            Err(e) => debug!("device states unavailable: {e}"),
        }

        match self.config.display_polling {
            Some(polling) => {
                let poller = DisplayPoller::spawn(
                    Arc::clone(&self.capabilities().displays),
                    Arc::clone(&self.shared.hotplug),
                    polling.interval,
                    polling.duration,
                )?;
                *self
                    .shared
                    .poller
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(poller);
            }
            None => {
                let listener: Arc<dyn DisplayListener> = self.shared.hotplug.clone();
                self.capabilities().displays.add_listener(listener);
                self.shared
                    .display_listener_registered
                    .store(true, Ordering::Release);
            }
        }

        // A stop that raced with the registrations above must not leave
        // callbacks behind.
        if self.shared.is_stopped() {
            self.shared.release_callbacks();
        }
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Runs the receive loop on the calling thread until the session ends.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for a malformed message or a fatal socket error.
    pub fn run(&mut self) -> Result<SessionEnd, SessionError> {
        if self.state == SessionState::Created {
            self.initialize()?;
        }
        self.state = SessionState::Running;
        info!("control session running");
        let result = self.receive_loop();
        match &result {
            Ok(end) => info!("control session ended: {end:?}"),
            Err(e) => error!("control session failed: {e}"),
        }
        result
    }

    fn receive_loop(&mut self) -> Result<SessionEnd, SessionError> {
        loop {
            if !self.shared.is_stopped() {
                if let Some(end) = self.send_notifications()? {
                    return Ok(end);
                }
            }

            self.reader
                .get_ref()
                .set_receive_timeout(Some(self.config.receive_timeout))?;
            match self.reader.prefetch() {
                Ok(true) => {}
                Ok(false) if self.shared.is_stopped() => return Ok(SessionEnd::Stopped),
                Ok(false) => continue,
                Err(ProtocolError::EndOfStream) => return Ok(SessionEnd::EndOfStream),
                Err(e) => return Err(e.into()),
            }
            self.reader.get_ref().set_receive_timeout(None)?;

            let message = match ControlMessage::read(&mut self.reader) {
                Ok(message) => message,
                Err(ProtocolError::EndOfStream) => {
                    debug!("end of control stream inside a message");
                    return Ok(SessionEnd::EndOfStream);
                }
                Err(e) => return Err(e.into()),
            };
            if self.shared.is_stopped() {
                trace!("dropping {:?} received after stop", message.kind());
                continue;
            }
            if let Some(end) = self.dispatch(message)? {
                return Ok(end);
            }
        }
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    fn send(&mut self, message: &ControlMessage) -> Step {
        let bytes = encode_message(message);
        match self.writer.write(&bytes, &[], self.config.write_timeout)? {
            WriteResult::Success => Ok(None),
            WriteResult::SuccessAfterBlocking => {
                debug!("{:?} sent after blocking", message.kind());
                Ok(None)
            }
            WriteResult::Timeout => {
                warn!("timed out sending {:?}", message.kind());
                Ok(Some(SessionEnd::WriteTimedOut))
            }
            WriteResult::Disconnected => Ok(Some(SessionEnd::Disconnected)),
        }
    }

    fn send_notifications(&mut self) -> Step {
        if self.clipboard.is_active() && self.shared.clipboard_changes.take() {
            if let Some(end) = self.send_clipboard_changed()? {
                return Ok(Some(end));
            }
        }

        if self.shared.posture_registered.load(Ordering::Acquire) {
            if let Some(state) = self.shared.posture.tracker().take_change() {
                debug!("sending device state {state}");
                if let Some(end) = self.send(&ControlMessage::DeviceStateChanged(state))? {
                    return Ok(Some(end));
                }
            }
        }

        for event in self.shared.hotplug.drain() {
            let message = match event {
                DisplayEvent::Added(display_id) => ControlMessage::DisplayAdded(display_id),
                DisplayEvent::Removed(display_id) => ControlMessage::DisplayRemoved(display_id),
            };
            debug!("sending {message:?}");
            if let Some(end) = self.send(&message)? {
                return Ok(Some(end));
            }
        }
        Ok(None)
    }

    fn send_clipboard_changed(&mut self) -> Step {
        let text = match self.capabilities().clipboard.text() {
            Ok(text) => text,
            Err(e) => {
                warn!("could not read the clipboard: {e}");
                return Ok(None);
            }
        };
        match self.clipboard.accept_change(text) {
            Some(text) => {
                debug!("sending clipboard change ({} bytes)", text.len());
                self.send(&ControlMessage::ClipboardChanged(text))
            }
            None => Ok(None),
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn dispatch(&mut self, message: ControlMessage) -> Step {
        let kind = message.kind();
        if kind != MessageKind::MotionEvent {
            debug!("processing {kind:?}");
        }
        match message {
            ControlMessage::MotionEvent(m) => self.process_motion_event(&m),
            ControlMessage::KeyEvent(m) => self.process_key_event(&m),
            ControlMessage::TextInput(text) => self.process_text_input(&text),
            ControlMessage::SetDeviceOrientation(orientation) => {
                self.set_device_orientation(orientation)
            }
            ControlMessage::SetMaxVideoResolution(m) => self.set_max_video_resolution(&m),
            ControlMessage::StartVideoStream(m) => self.start_video_stream(&m),
            ControlMessage::StopVideoStream(display_id) => {
                if let Err(e) = self.capabilities().video.stop(display_id) {
                    error!("could not stop video stream for display {display_id}: {e}");
                }
            }
            ControlMessage::StartClipboardSync(m) => self.start_clipboard_sync(&m),
            ControlMessage::StopClipboardSync => self.stop_clipboard_sync(),
            ControlMessage::RequestDeviceState(state) => {
                if let Err(e) = self.capabilities().device_state.request_state(state, 0) {
                    error!("could not request device state {state}: {e}");
                }
            }
            ControlMessage::DisplayConfigurationRequest(request_id) => {
                return self.send_display_configuration(request_id)
            }
            ControlMessage::UiSettingsRequest(request_id) => {
                let settings = self.capabilities().ui_settings.snapshot();
                return self.send(&ControlMessage::UiSettingsResponse(
                    UiSettingsResponseMessage {
                        request_id,
                        settings,
                    },
                ));
            }
            ControlMessage::SetDarkMode(on) => self.capabilities().ui_settings.set_dark_mode(on),
            ControlMessage::SetFontSize(size) => self.capabilities().ui_settings.set_font_size(size),
            ControlMessage::SetScreenDensity(density) => {
                self.capabilities().ui_settings.set_screen_density(density)
            }
            ControlMessage::SetTalkBack(on) => self.capabilities().ui_settings.set_talkback(on),
            ControlMessage::SetSelectToSpeak(on) => {
                self.capabilities().ui_settings.set_select_to_speak(on)
            }
            ControlMessage::SetAppLanguage(m) => self
                .capabilities()
                .ui_settings
                .set_app_language(&m.application_id, &m.locale),
            ControlMessage::SetGestureNavigation(on) => {
                self.capabilities().ui_settings.set_gesture_navigation(on)
            }
            ControlMessage::ClipboardChanged(_)
            | ControlMessage::SupportedDeviceStates(_)
            | ControlMessage::DeviceStateChanged(_)
            | ControlMessage::DisplayConfigurationResponse(_)
            | ControlMessage::DisplayAdded(_)
            | ControlMessage::DisplayRemoved(_)
            | ControlMessage::ErrorResponse(_)
            | ControlMessage::UiSettingsResponse(_) => {
                warn!("ignoring {kind:?}: only the device sends it");
            }
        }
        Ok(None)
    }

    fn process_motion_event(&mut self, m: &MotionEventMessage) {
        let display = self.capabilities().displays.display_info(m.display_id);
        if display.is_none() {
            debug!("motion event for unknown display {}", m.display_id);
        }
        let translation = self
            .gestures
            .translate(m, display.as_ref(), uptime_millis());
        for event in &translation.events {
            self.inject_motion(event);
        }

        if translation.gesture_ended {
            // The gesture may have launched an app with a fixed orientation.
            self.capabilities()
                .video
                .set_orientation(m.display_id, VideoOrientation::CurrentVideo);
            if display.is_some_and(|d| !d.is_on()) {
                self.wake_up_device();
            }
        }
    }

    fn inject_motion(&self, event: &MotionEvent) {
        if event.action == motion_action::HOVER_MOVE {
            trace!("injecting {event:?}");
        } else {
            debug!("injecting {event:?}");
        }
        if let Err(e) = self
            .capabilities()
            .input
            .inject_motion(event, InjectionSync::None)
        {
            error!("motion event injection failed: {e}");
        }
    }

    fn inject_key(&self, event: &KeyEvent) {
        debug!("injecting {event:?}");
        if let Err(e) = self.capabilities().input.inject_key(event, InjectionSync::None) {
            error!("key event injection failed: {e}");
        }
    }

    fn process_key_event(&self, m: &KeyEventMessage) {
        let now = uptime_millis();
        let mut event = KeyEvent {
            action: if m.action == key_action::DOWN_AND_UP {
                key_action::DOWN
            } else {
                m.action
            },
            keycode: m.keycode,
            meta_state: m.meta_state,
            device_id: VIRTUAL_KEYBOARD,
            source: source::KEYBOARD,
            down_time_millis: now,
            event_time_millis: now,
        };
        self.inject_key(&event);
        if m.action == key_action::DOWN_AND_UP {
            event.action = key_action::UP;
            self.inject_key(&event);
        }
    }

    fn wake_up_device(&self) {
        self.process_key_event(&KeyEventMessage {
            action: key_action::DOWN_AND_UP,
            keycode: keycode::WAKEUP,
            meta_state: 0,
        });
    }

    fn process_text_input(&self, text: &str) {
        for unit in text.encode_utf16() {
            match self.capabilities().input.key_events_for_char(unit) {
                Some(events) => {
                    for event in &events {
                        self.inject_key(event);
                    }
                }
                None => error!("unable to map character '\\u{unit:04X}' to key events"),
            }
        }
    }

    fn set_device_orientation(&self, orientation: i32) {
        match Rotation::from_quarter_turns(orientation) {
            Some(rotation) => self
                .capabilities()
                .video
                .set_orientation(DEFAULT_DISPLAY, VideoOrientation::Fixed(rotation)),
            None => error!("an attempt to set an invalid device orientation: {orientation}"),
        }
    }

    fn set_max_video_resolution(&self, m: &VideoResolutionMessage) {
        if check_video_size(m.max_size) {
            self.capabilities()
                .video
                .set_max_resolution(m.display_id, m.max_size);
        }
    }

    fn start_video_stream(&self, m: &VideoResolutionMessage) {
        if !check_video_size(m.max_size) {
            return;
        }
        if let Err(e) = self.capabilities().video.start(m.display_id, m.max_size) {
            error!("could not start video stream for display {}: {e}", m.display_id);
        }
        self.wake_up_device();
    }

    fn start_clipboard_sync(&mut self, m: &StartClipboardSyncMessage) {
        let decision = self.clipboard.start(m);
        if decision.push_text {
            if let Err(e) = self.capabilities().clipboard.set_text(&m.text) {
                error!("could not set the clipboard text: {e}");
            }
        }
        match decision.subscription {
            Subscription::Subscribe => self.shared.subscribe_clipboard(),
            Subscription::Unsubscribe => self.shared.unsubscribe_clipboard(),
            Subscription::Unchanged => {}
        }
    }

    fn stop_clipboard_sync(&mut self) {
        if self.clipboard.stop() {
            self.shared.unsubscribe_clipboard();
        }
    }

    fn send_display_configuration(&mut self, request_id: i32) -> Step {
        let registry = Arc::clone(&self.capabilities().displays);
        let display_ids = match registry.display_ids() {
            Ok(ids) => ids,
            Err(e) => {
                error!("could not list displays: {e}");
                return self.send(&ControlMessage::ErrorResponse(ErrorResponseMessage {
                    request_id,
                    message: e.to_string(),
                }));
            }
        };
        let displays: Vec<DisplayDescriptor> = display_ids
            .into_iter()
            .filter_map(|display_id| {
                let info = registry.display_info(display_id)?;
                if !info.is_on() || info.is_private() {
                    return None;
                }
                debug!(
                    "returning display configuration: display {display_id} flags {:#x} size {} rotation {:?}",
                    info.flags, info.logical_size, info.rotation
                );
                Some(DisplayDescriptor {
                    display_id,
                    logical_size: info.logical_size,
                    rotation: info.rotation.quarter_turns(),
                    display_type: info.display_type,
                })
            })
            .collect();
        self.send(&ControlMessage::DisplayConfigurationResponse(
            DisplayConfigurationResponseMessage {
                request_id,
                displays,
            },
        ))
    }
}

impl<C: ControlChannel> Drop for SessionController<C> {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

fn check_video_size(size: Size) -> bool {
    if size.is_positive() {
        true
    } else {
        error!("an attempt to set an invalid video resolution: {size}");
        false
    }
}

/// Milliseconds of monotonic uptime, the time base of injected events.
#[cfg(unix)]
fn uptime_millis() -> i64 {
    use nix::sys::time::TimeValLike;
    use nix::time::{clock_gettime, ClockId};

    clock_gettime(ClockId::CLOCK_MONOTONIC)
        .map(|now| now.num_milliseconds())
        .unwrap_or_else(|_| fallback_uptime_millis())
}

#[cfg(not(unix))]
fn uptime_millis() -> i64 {
    fallback_uptime_millis()
}

fn fallback_uptime_millis() -> i64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static STARTED: OnceLock<Instant> = OnceLock::new();
    // Never zero: a zero start time means "no gesture".
    1 + STARTED.get_or_init(Instant::now).elapsed().as_millis() as i64
}
