//! Recording input injector.
//!
//! Performs no OS calls.  Every injected event is pushed into a
//! `Mutex<Vec<...>>` so tests can inspect exactly what was injected and in
//! what order.  The binary uses it too when no platform injector is wired in,
//! logging each event instead of delivering it.  Only the latest
//! [`RECORDING_LIMIT`] events of each kind are kept.
//!
//! Set `should_fail = true` to make every injection return
//! [`CapabilityError::Platform`].

use std::sync::Mutex;

use tracing::trace;

use super::key_events_for_ascii;
use crate::application::capabilities::{
    CapabilityError, InjectionSync, InputInjector, KeyEvent, MotionEvent,
};

/// Entries a recording keeps before dropping the oldest.
pub const RECORDING_LIMIT: usize = 4096;

/// Appends `item`, dropping the oldest entries beyond [`RECORDING_LIMIT`].
pub(crate) fn record_bounded<T>(list: &Mutex<Vec<T>>, item: T) {
    let mut list = list.lock().expect("lock poisoned");
    if list.len() >= RECORDING_LIMIT {
        let excess = list.len() + 1 - RECORDING_LIMIT;
        list.drain(..excess);
    }
    list.push(item);
}

#[derive(Debug, Default)]
pub struct RecordingInputInjector {
    pub motions: Mutex<Vec<MotionEvent>>,
    pub keys: Mutex<Vec<KeyEvent>>,
    pub should_fail: bool,
}

impl RecordingInputInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an injector whose injections all fail.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn motions(&self) -> Vec<MotionEvent> {
        self.motions.lock().expect("lock poisoned").clone()
    }

    pub fn keys(&self) -> Vec<KeyEvent> {
        self.keys.lock().expect("lock poisoned").clone()
    }

    fn check_failure(&self) -> Result<(), CapabilityError> {
        if self.should_fail {
            return Err(CapabilityError::Platform("injection rejected".to_string()));
        }
        Ok(())
    }
}

impl InputInjector for RecordingInputInjector {
    fn inject_motion(&self, event: &MotionEvent, _sync: InjectionSync) -> Result<(), CapabilityError> {
        self.check_failure()?;
        trace!("recorded motion action {:#x}", event.action);
        record_bounded(&self.motions, event.clone());
        Ok(())
    }

    fn inject_key(&self, event: &KeyEvent, _sync: InjectionSync) -> Result<(), CapabilityError> {
        self.check_failure()?;
        trace!("recorded key {} action {}", event.keycode, event.action);
        record_bounded(&self.keys, *event);
        Ok(())
    }

    fn key_events_for_char(&self, unit: u16) -> Option<Vec<KeyEvent>> {
        key_events_for_ascii(unit)
    }
}
