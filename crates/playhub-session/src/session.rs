//! Session types: the registry's record of one live connection.
//!
//! A session ties together:
//! - WHO is connected (`UserId`)
//! - WHICH socket it is (`ConnectionId`, so a replaced socket's late close
//!   can be recognised and ignored)
//! - HOW to reach it (the outbox drained by the connection's writer task)

use playhub_protocol::{Envelope, UserId};
use playhub_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender feeding a connection's writer task.
///
/// Unbounded so delivery from the engine never awaits; a slow socket only
/// grows its own queue.
pub type Outbox = mpsc::UnboundedSender<Envelope>;

/// A single user's live connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which user this connection belongs to.
    pub user: UserId,

    /// Which transport connection carries it.
    pub connection: ConnectionId,

    /// Where outbound envelopes are pushed.
    pub outbox: Outbox,
}

impl Session {
    /// Returns `true` while the writer side is still draining the outbox.
    ///
    /// Once the writer task ends (socket closed) the receiver is dropped
    /// and the outbox reports closed, even before the handler has
    /// unregistered the session.
    pub fn is_live(&self) -> bool {
        !self.outbox.is_closed()
    }
}
