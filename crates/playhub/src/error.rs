//! Unified error type for the playhub server.

use playhub_protocol::ProtocolError;
use playhub_room::RoomError;
use playhub_session::SessionError;
use playhub_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `playhub` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlayhubError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unexpected message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (authentication, delivery).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session engine is gone or refused the command.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        ));
        let playhub_err: PlayhubError = err.into();
        assert!(matches!(playhub_err, PlayhubError::Transport(_)));
        assert!(playhub_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let playhub_err: PlayhubError = err.into();
        assert!(matches!(playhub_err, PlayhubError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AuthFailed("nope".into());
        let playhub_err: PlayhubError = err.into();
        assert!(matches!(playhub_err, PlayhubError::Session(_)));
        assert!(playhub_err.to_string().contains("nope"));
    }

    #[test]
    fn test_from_room_error() {
        let playhub_err: PlayhubError = RoomError::Unavailable.into();
        assert!(matches!(playhub_err, PlayhubError::Room(_)));
    }
}
