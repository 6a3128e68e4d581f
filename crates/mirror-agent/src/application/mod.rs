//! Application layer of the agent.
//!
//! # What lives here?
//!
//! - **`capabilities`** – Traits for every platform service the agent calls
//!   (input injection, device posture, clipboard, displays, video streaming,
//!   UI settings) and the listener traits those services call back through.
//!
//! - **`gesture`** – Pure translation of a received motion message into the
//!   single-pointer-transition events the injector accepts.
//!
//! - **`clipboard_sync`**, **`posture`**, **`hotplug`** – The state behind the
//!   three kinds of unsolicited notifications.
//!
//! - **`session`** – The session controller: receive loop, dispatch, and
//!   notification emission for one connection.

pub mod capabilities;
pub mod clipboard_sync;
pub mod gesture;
pub mod hotplug;
pub mod posture;
pub mod session;
