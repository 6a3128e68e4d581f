//! Protocol module containing the varint streams, message types, and the codec.

pub mod base128;
pub mod codec;
pub mod messages;

pub use base128::{Base128Reader, Base128Writer};
pub use codec::{decode_message, encode_message, ProtocolError};
pub use messages::*;
