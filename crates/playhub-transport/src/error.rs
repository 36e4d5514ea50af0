/// What can go wrong on a socket.
///
/// Every variant wraps an `io::Error`; WebSocket protocol errors are
/// folded into one with a fitting `ErrorKind`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding, accepting or the WebSocket upgrade failed.
    #[error("could not accept socket: {0}")]
    AcceptFailed(#[source] std::io::Error),

    #[error("could not write frame: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("could not read frame: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
