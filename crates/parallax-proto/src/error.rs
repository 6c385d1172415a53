//! Error types for the wire protocol.

use thiserror::Error;

/// Protocol errors.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unsupported protocol version.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    /// Unknown frame type discriminant.
    #[error("unknown frame type: {0}")]
    UnknownFrameType(u16),

    /// Frame shorter than the fixed header or truncated payload.
    #[error("invalid frame header: {0}")]
    InvalidFrameHeader(String),

    /// Packet exceeded the size limit.
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// A class-tagged object used an alias that is not registered.
    #[error("unregistered class alias: {0}")]
    UnregisteredAlias(String),

    /// Serialisation error.
    #[error("serialisation error: {0}")]
    Serialisation(String),

    /// Deserialisation error.
    #[error("deserialisation error: {0}")]
    Deserialisation(String),
}
