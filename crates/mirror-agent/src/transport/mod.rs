//! Control socket plumbing shared by the session controller and the binary.
//!
//! - **`channel`** – the [`ControlChannel`](channel::ControlChannel) trait with
//!   implementations for Unix-domain and TCP streams.
//! - **`socket_writer`** – delivers a two-part message within a time budget,
//!   surviving partial writes and transient blocking.

pub mod channel;
pub mod socket_writer;

pub use channel::{ControlChannel, WaitWritable};
pub use socket_writer::{SocketWriteError, SocketWriter, WriteResult};
