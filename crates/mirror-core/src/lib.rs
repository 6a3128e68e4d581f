//! # mirror-core
//!
//! Shared library for the device mirroring agent containing the control
//! channel codec, the message catalogue, display geometry, and the platform
//! input constants used when translating remote gestures.
//!
//! It has zero dependencies on OS APIs or sockets: the codec reads from any
//! [`std::io::Read`] and writes into an in-memory buffer.
//!
//! # Architecture overview
//!
//! The agent runs on a device whose screen is mirrored to a remote controller.
//! The controller sends commands (touches, key presses, clipboard contents,
//! video settings) over a control socket and the agent replies with
//! notifications (clipboard changes, fold posture changes, display hotplug).
//!
//! - **`protocol`** – How bytes travel over the control socket.  Every message
//!   is a varint kind tag followed by varint-encoded fields.
//!
//! - **`domain`** – Display geometry (sizes, rotations, the rotation
//!   compensation transform) and the platform input constants.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `mirror_core::ControlMessage` instead of the full module path.
pub use domain::display::DisplayInfo;
pub use domain::geometry::{Point, Rotation, Size};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::{ControlMessage, MessageKind};
