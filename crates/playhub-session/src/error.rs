//! Error types for the session layer.

use playhub_protocol::UserId;

/// Errors that can occur while authenticating or reaching a user.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Authentication failed: the token was missing, unknown or rejected
    /// by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No connection is registered for the user.
    #[error("no connection registered for {0}")]
    NotConnected(UserId),

    /// The user's connection is registered but its writer has gone away.
    #[error("connection of {0} is closed")]
    ConnectionClosed(UserId),
}
