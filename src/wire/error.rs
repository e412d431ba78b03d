use thiserror::Error;

/// Failures raised while walking protobuf wire bytes.
///
/// Both variants are fatal to the message scope being decoded. Callers that
/// iterate feed entities contain them at the entity boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A primitive read ran past the end of the buffer, or a varint carried
    /// more than 64 bits of payload.
    #[error("truncated protobuf message")]
    Truncated,

    /// Group start/end markers (3/4) or a wire type outside the protocol.
    #[error("unsupported protobuf wire type: {0}")]
    UnsupportedWireType(u8),
}
