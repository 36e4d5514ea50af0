//! Error types for the protocol layer.
//!
//! Each playhub crate defines its own error enum. When you see a
//! `ProtocolError`, the problem is in (de)serialization or in the shape
//! of a message, not in networking or room management.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into JSON).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes or a payload into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, wrong
    /// field types.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope's `type` is not one the server understands.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The message parsed but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
