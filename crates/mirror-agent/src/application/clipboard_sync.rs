//! Clipboard mirror state owned by the receive loop.
//!
//! The controller keeps the last text it exchanged with the peer (in either
//! direction) so that it never echoes a text back to where it came from.

use std::sync::atomic::{AtomicBool, Ordering};

use mirror_core::protocol::messages::StartClipboardSyncMessage;

use crate::application::capabilities::ClipboardListener;

/// Worst-case UTF-8 length of one character, used for the cheap length check.
pub const UTF8_MAX_BYTES_PER_CHARACTER: usize = 4;

/// Effect of a start request on the clipboard listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Subscribe,
    Unsubscribe,
    Unchanged,
}

/// Decision returned by [`ClipboardMirror::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStart {
    /// The received text differs from the last known one and must be placed
    /// on the device clipboard.
    pub push_text: bool,
    pub subscription: Subscription,
}

#[derive(Debug, Default)]
pub struct ClipboardMirror {
    last_text: String,
    /// `0` while sync is off.
    max_synced_length: usize,
}

impl ClipboardMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.max_synced_length != 0
    }

    pub fn max_synced_length(&self) -> usize {
        self.max_synced_length
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    /// Records a start request.  A non-positive maximum length turns change
    /// notifications off while still accepting the pushed text.
    pub fn start(&mut self, msg: &StartClipboardSyncMessage) -> SyncStart {
        let push_text = msg.text != self.last_text;
        if push_text {
            self.last_text = msg.text.clone();
        }
        let was_active = self.is_active();
        self.max_synced_length = usize::try_from(msg.max_synced_length).unwrap_or(0);
        let subscription = match (was_active, self.is_active()) {
            (false, true) => Subscription::Subscribe,
            (true, false) => Subscription::Unsubscribe,
            _ => Subscription::Unchanged,
        };
        SyncStart {
            push_text,
            subscription,
        }
    }

    /// Turns sync off.  Returns `true` if it was on, in which case the caller
    /// must unregister the clipboard listener.
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.max_synced_length = 0;
        self.last_text.clear();
        true
    }

    /// Decides whether a freshly read clipboard text is sent to the peer.
    ///
    /// Returns the text to send, or `None` when it is empty, unchanged, or too
    /// long for the negotiated maximum.
    pub fn accept_change(&mut self, text: String) -> Option<String> {
        if text.is_empty() || text == self.last_text {
            return None;
        }
        let max_length = self.max_synced_length;
        if text.len() > max_length.saturating_mul(UTF8_MAX_BYTES_PER_CHARACTER)
            || text.chars().count() > max_length
        {
            return None;
        }
        self.last_text.clone_from(&text);
        Some(text)
    }
}

/// Clipboard listener that only records that a change happened.  The receive
/// loop reads the clipboard itself after taking the flag.
#[derive(Debug, Default)]
pub struct ClipboardChangeFlag {
    changed: AtomicBool,
}

impl ClipboardChangeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

impl ClipboardListener for ClipboardChangeFlag {
    fn on_primary_clip_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }
}
