//! The connection registry: identity → single live connection.
//!
//! Everything that delivers a message to a user goes through here. The
//! registry is keyed by [`UserId`], so a user has at most one registered
//! connection; a second login replaces the first.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain `HashMap`, not a concurrent map. It is
//! owned by the session engine actor and only ever touched from that one
//! task, so no locking is needed here.

use std::collections::HashMap;

use playhub_protocol::{Envelope, UserId};
use playhub_transport::ConnectionId;

use crate::{Outbox, Session, SessionError};

/// Maps each user to their live connection.
///
/// ## Lifecycle
///
/// ```text
/// handshake ok ──→ register() ──→ send() … ──→ socket closed ──→ unregister()
///                      │                                            │
///                      └─ replaces an older session of the user     └─ no-op if the
///                         (its writer ends when the outbox drops)     id was replaced
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<UserId, Session>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` as the live connection of `user`.
    ///
    /// Returns the session it replaced, if any. Dropping the returned
    /// session drops its outbox, which ends the old socket's writer.
    pub fn register(
        &mut self,
        user: UserId,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> Option<Session> {
        let session = Session {
            user: user.clone(),
            connection,
            outbox,
        };
        let previous = self.sessions.insert(user.clone(), session);
        match &previous {
            Some(old) => tracing::info!(
                %user,
                %connection,
                replaced = %old.connection,
                "connection replaced"
            ),
            None => tracing::info!(%user, %connection, "connection registered"),
        }
        previous
    }

    /// Removes the user's entry, but only if it still belongs to
    /// `connection`.
    ///
    /// Returns `true` if an entry was removed. A close event from a socket
    /// that was already replaced by a newer login returns `false` and
    /// leaves the newer connection alone.
    pub fn unregister(&mut self, user: &UserId, connection: ConnectionId) -> bool {
        match self.sessions.get(user) {
            Some(session) if session.connection == connection => {
                self.sessions.remove(user);
                tracing::info!(%user, %connection, "connection unregistered");
                true
            }
            Some(session) => {
                tracing::debug!(
                    %user,
                    stale = %connection,
                    live = %session.connection,
                    "ignoring close of replaced connection"
                );
                false
            }
            None => false,
        }
    }

    /// Looks up a user's session.
    pub fn get(&self, user: &UserId) -> Option<&Session> {
        self.sessions.get(user)
    }

    /// Returns `true` if the user has a registered connection whose writer
    /// is still running.
    pub fn is_live(&self, user: &UserId) -> bool {
        self.sessions.get(user).is_some_and(Session::is_live)
    }

    /// Pushes an envelope into the user's outbox.
    ///
    /// # Errors
    /// - [`SessionError::NotConnected`]: nobody is registered under `user`
    /// - [`SessionError::ConnectionClosed`]: the writer already went away
    pub fn send(&self, user: &UserId, envelope: Envelope) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(user)
            .ok_or_else(|| SessionError::NotConnected(user.clone()))?;
        session
            .outbox
            .send(envelope)
            .map_err(|_| SessionError::ConnectionClosed(user.clone()))
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn user(name: &str) -> UserId {
        UserId::from(name)
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_register_new_user_is_live() {
        let mut reg = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        assert!(reg.register(user("alice"), conn(1), tx).is_none());

        assert!(reg.is_live(&user("alice")));
        assert_eq!(reg.get(&user("alice")).unwrap().connection, conn(1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_register_twice_replaces_previous_connection() {
        let mut reg = ConnectionRegistry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        reg.register(user("alice"), conn(1), tx1);

        let previous = reg.register(user("alice"), conn(2), tx2);

        assert_eq!(previous.unwrap().connection, conn(1));
        assert_eq!(reg.get(&user("alice")).unwrap().connection, conn(2));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_unregister_stale_connection_keeps_newer_one() {
        let mut reg = ConnectionRegistry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        reg.register(user("alice"), conn(1), tx1);
        reg.register(user("alice"), conn(2), tx2);

        assert!(!reg.unregister(&user("alice"), conn(1)));
        assert!(reg.is_live(&user("alice")));

        assert!(reg.unregister(&user("alice"), conn(2)));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_is_live_false_after_writer_dropped() {
        let mut reg = ConnectionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        reg.register(user("alice"), conn(1), tx);

        drop(rx);

        assert!(!reg.is_live(&user("alice")));
        assert!(reg.get(&user("alice")).is_some(), "entry stays until unregister");
    }

    #[test]
    fn test_send_delivers_to_outbox() {
        let mut reg = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        reg.register(user("alice"), conn(1), tx);

        reg.send(&user("alice"), Envelope::new("caro:waiting", json!({})))
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().kind, "caro:waiting");
    }

    #[test]
    fn test_send_unknown_user_returns_not_connected() {
        let reg = ConnectionRegistry::new();
        let result = reg.send(&user("ghost"), Envelope::new("x:y", json!({})));
        assert!(matches!(result, Err(SessionError::NotConnected(_))));
    }

    #[test]
    fn test_send_to_closed_outbox_returns_connection_closed() {
        let mut reg = ConnectionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        reg.register(user("alice"), conn(1), tx);
        drop(rx);

        let result = reg.send(&user("alice"), Envelope::new("x:y", json!({})));
        assert!(matches!(result, Err(SessionError::ConnectionClosed(_))));
    }
}
