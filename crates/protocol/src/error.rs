//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering all possible failure modes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    // Frame errors
    /// The master delivered a frame without a command byte.
    #[error("unexpected zero length read from master")]
    EmptyFrame,

    /// The command byte is not part of the inbound command set.
    #[error("unknown message type `{}` (0x{:02x})", char::from(*.0), .0)]
    UnknownCommand(u8),

    // Resize errors
    /// A ResizeTerminal frame arrived without arguments.
    #[error("received malformed remote command for terminal resize: empty payload")]
    EmptyResizePayload,

    /// The ResizeTerminal arguments are not the expected JSON object.
    #[error("received malformed data for terminal resize: {0}")]
    MalformedResize(String),

    // Serialization errors
    /// Failed to serialize data.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize data.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_eof() || err.is_syntax() {
            ProtocolError::Deserialization(err.to_string())
        } else {
            ProtocolError::Serialization(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for ProtocolError {
    fn from(err: base64::DecodeError) -> Self {
        ProtocolError::Deserialization(err.to_string())
    }
}
