//! Foldable posture tracking.
//!
//! The device-state provider reports posture changes on its own thread.  The
//! callback only swaps the new value into an atomic; the receive loop later
//! compares it with the last value it sent and emits a notification on change.
//! Several changes between two loop iterations therefore collapse into at most
//! one notification carrying the latest value.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use mirror_core::domain::display::DEFAULT_DISPLAY;
use tracing::debug;

use crate::application::capabilities::{
    CapabilityError, DeviceStateListener, DeviceStateProvider, VideoOrientation, VideoStreamer,
};

/// Posture value before the first report.
pub const UNKNOWN_POSTURE: i32 = -1;

const DEVICE_STATE_ENTRY: &str = "DeviceState{";

/// Returns `true` if the supported-states text describes more than one state.
pub fn contains_multiple_states(states_text: &str) -> bool {
    match (
        states_text.find(DEVICE_STATE_ENTRY),
        states_text.rfind(DEVICE_STATE_ENTRY),
    ) {
        (Some(first), Some(last)) => first != last,
        _ => false,
    }
}

/// Returns the supported-states text if the device has more than one posture.
pub fn probe_supported_states(
    provider: &dyn DeviceStateProvider,
) -> Result<Option<String>, CapabilityError> {
    let states_text = provider.supported_states()?;
    debug!("supported device states: {states_text}");
    Ok(contains_multiple_states(&states_text).then_some(states_text))
}

#[derive(Debug)]
pub struct PostureTracker {
    current: AtomicI32,
    last_sent: AtomicI32,
}

impl Default for PostureTracker {
    fn default() -> Self {
        Self {
            current: AtomicI32::new(UNKNOWN_POSTURE),
            last_sent: AtomicI32::new(UNKNOWN_POSTURE),
        }
    }
}

impl PostureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new posture.  Returns `true` if it differs from the previous one.
    pub fn update(&self, state: i32) -> bool {
        self.current.swap(state, Ordering::AcqRel) != state
    }

    pub fn current(&self) -> i32 {
        self.current.load(Ordering::Acquire)
    }

    /// Returns the current posture if it has not been sent yet and marks it
    /// as sent.  Only the receive loop calls this.
    pub fn take_change(&self) -> Option<i32> {
        let current = self.current.load(Ordering::Acquire);
        if current == self.last_sent.load(Ordering::Relaxed) {
            return None;
        }
        self.last_sent.store(current, Ordering::Relaxed);
        Some(current)
    }
}

/// Device-state listener that feeds a [`PostureTracker`] and asks the video
/// streamer to re-derive the display orientation on every change.
pub struct PostureWatcher {
    tracker: PostureTracker,
    video: Arc<dyn VideoStreamer>,
}

impl PostureWatcher {
    pub fn new(video: Arc<dyn VideoStreamer>) -> Self {
        Self {
            tracker: PostureTracker::new(),
            video,
        }
    }

    pub fn tracker(&self) -> &PostureTracker {
        &self.tracker
    }
}

impl DeviceStateListener for PostureWatcher {
    fn on_device_state_changed(&self, state: i32) {
        debug!("device state changed to {state}");
        if self.tracker.update(state) {
            self.video
                .set_orientation(DEFAULT_DISPLAY, VideoOrientation::CurrentDisplay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::capabilities::{MockDeviceStateProvider, MockVideoStreamer};
    use mockall::predicate::eq;

    const TWO_STATES: &str = "DeviceState{identifier=0, name='CLOSE'}, DeviceState{identifier=1, name='OPEN'}";

    #[test]
    fn test_contains_multiple_states() {
        assert!(contains_multiple_states(TWO_STATES));
        assert!(!contains_multiple_states("DeviceState{identifier=0, name='DEFAULT'}"));
        assert!(!contains_multiple_states(""));
    }

    #[test]
    fn test_notification_only_on_change() {
        // Arrange
        let tracker = PostureTracker::new();

        // Act / Assert
        assert_eq!(tracker.take_change(), None);
        tracker.update(1);
        assert_eq!(tracker.take_change(), Some(1));
        assert_eq!(tracker.take_change(), None);
        tracker.update(1);
        assert_eq!(tracker.take_change(), None);
    }

    #[test]
    fn test_changes_between_checks_collapse_to_latest() {
        let tracker = PostureTracker::new();
        tracker.update(0);
        tracker.take_change();

        tracker.update(1);
        tracker.update(2);
        tracker.update(0);

        // Back at the value last sent: nothing to report.
        assert_eq!(tracker.take_change(), None);
        tracker.update(2);
        assert_eq!(tracker.take_change(), Some(2));
    }

    #[test]
    fn test_watcher_refreshes_orientation_only_on_change() {
        // Arrange
        let mut video = MockVideoStreamer::new();
        video
            .expect_set_orientation()
            .with(eq(DEFAULT_DISPLAY), eq(VideoOrientation::CurrentDisplay))
            .times(2)
            .return_const(());
        let watcher = PostureWatcher::new(Arc::new(video));

        // Act
        watcher.on_device_state_changed(1);
        watcher.on_device_state_changed(1);
        watcher.on_device_state_changed(2);

        // Assert
        assert_eq!(watcher.tracker().current(), 2);
    }

    #[test]
    fn test_probe_ignores_single_state_devices() {
        // Arrange
        let mut provider = MockDeviceStateProvider::new();
        provider
            .expect_supported_states()
            .times(1)
            .returning(|| Ok("DeviceState{identifier=0}".to_string()));

        // Act
        let result = probe_supported_states(&provider).unwrap();

        // Assert
        assert_eq!(result, None);
    }

    #[test]
    fn test_probe_returns_text_for_foldables() {
        let mut provider = MockDeviceStateProvider::new();
        provider
            .expect_supported_states()
            .returning(|| Ok(TWO_STATES.to_string()));

        assert_eq!(
            probe_supported_states(&provider).unwrap(),
            Some(TWO_STATES.to_string())
        );
    }

    #[test]
    fn test_probe_propagates_provider_failure() {
        let mut provider = MockDeviceStateProvider::new();
        provider
            .expect_supported_states()
            .returning(|| Err(CapabilityError::Unavailable("device_state".to_string())));

        assert!(probe_supported_states(&provider).is_err());
    }
}
