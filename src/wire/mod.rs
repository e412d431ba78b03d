//! Protobuf wire-format primitives.
//!
//! [`ByteCursor`] performs bounds-checked primitive reads; the tag and skip
//! helpers in `decoder` layer the protocol's field framing on top.

mod cursor;
mod decoder;
mod error;

pub use cursor::ByteCursor;
pub use decoder::{Tag, WireType};
pub use error::DecodeError;

#[cfg(test)]
pub(crate) use cursor::encode_varint;
