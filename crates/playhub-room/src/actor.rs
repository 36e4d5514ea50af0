//! Engine actor: the single Tokio task that owns the [`SessionEngine`].
//!
//! Connection handlers never touch engine state. They send commands down
//! one unbounded channel and the actor applies them strictly in arrival
//! order, each to completion before the next.

use playhub_protocol::{Envelope, UserId};
use playhub_session::Outbox;
use playhub_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{EngineStats, RoomError, SessionEngine};

/// Commands sent to the engine actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and awaits the answer on it.
pub(crate) enum EngineCommand {
    /// An authenticated connection is ready to receive events.
    Connect {
        user: UserId,
        connection: ConnectionId,
        outbox: Outbox,
        reply: oneshot::Sender<()>,
    },

    /// A message read from a connection.
    Inbound {
        user: UserId,
        connection: ConnectionId,
        envelope: Envelope,
    },

    /// A connection closed.
    Disconnect {
        user: UserId,
        connection: ConnectionId,
    },

    /// Request a counters snapshot.
    Stats { reply: oneshot::Sender<EngineStats> },

    /// Stop the actor.
    Shutdown,
}

/// Handle to the running engine actor.
///
/// Cheap to clone: it's just an `mpsc::UnboundedSender` wrapper. Every
/// connection handler holds one.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    fn send(&self, command: EngineCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .map_err(|_| RoomError::Unavailable)
    }

    /// Registers a connection and waits until the engine has done so.
    ///
    /// Once this returns, events for `user` are delivered to `outbox`.
    pub async fn connect(
        &self,
        user: UserId,
        connection: ConnectionId,
        outbox: Outbox,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineCommand::Connect {
            user,
            connection,
            outbox,
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Forwards a client message (fire-and-forget).
    pub fn inbound(
        &self,
        user: UserId,
        connection: ConnectionId,
        envelope: Envelope,
    ) -> Result<(), RoomError> {
        self.send(EngineCommand::Inbound {
            user,
            connection,
            envelope,
        })
    }

    /// Reports a closed connection. Never blocks, so it is safe to call
    /// from `Drop`.
    pub fn disconnect(&self, user: UserId, connection: ConnectionId) -> Result<(), RoomError> {
        self.send(EngineCommand::Disconnect { user, connection })
    }

    /// Requests the current counters.
    pub async fn stats(&self) -> Result<EngineStats, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineCommand::Stats { reply: reply_tx })?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Tells the engine to stop after the commands already queued.
    pub fn shutdown(&self) -> Result<(), RoomError> {
        self.send(EngineCommand::Shutdown)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Runs the actor loop, processing commands until shutdown.
async fn run(mut engine: SessionEngine, mut receiver: mpsc::UnboundedReceiver<EngineCommand>) {
    tracing::info!("session engine started");

    while let Some(command) = receiver.recv().await {
        match command {
            EngineCommand::Connect {
                user,
                connection,
                outbox,
                reply,
            } => {
                engine.connect(user, connection, outbox);
                let _ = reply.send(());
            }
            EngineCommand::Inbound {
                user,
                connection,
                envelope,
            } => {
                engine.handle_inbound(&user, connection, &envelope);
            }
            EngineCommand::Disconnect { user, connection } => {
                engine.disconnect(&user, connection);
            }
            EngineCommand::Stats { reply } => {
                let _ = reply.send(engine.stats());
            }
            EngineCommand::Shutdown => {
                tracing::info!("session engine shutting down");
                break;
            }
        }
    }

    tracing::info!("session engine stopped");
}

/// Spawns the engine actor task and returns a handle to it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_engine(engine: SessionEngine) -> EngineHandle {
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(run(engine, receiver));
    EngineHandle { sender }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;

    #[tokio::test]
    async fn test_connect_then_stats_counts_connection() {
        let handle = spawn_engine(SessionEngine::new(EngineConfig::default()));
        let (tx, _rx) = mpsc::unbounded_channel();

        handle
            .connect(UserId::from("alice"), ConnectionId::new(1), tx)
            .await
            .unwrap();

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.connections, 1);
        assert_eq!(stats.rooms, 0);
    }

    #[tokio::test]
    async fn test_disconnect_is_processed_in_order() {
        let handle = spawn_engine(SessionEngine::new(EngineConfig::default()));
        let (tx, _rx) = mpsc::unbounded_channel();
        handle
            .connect(UserId::from("alice"), ConnectionId::new(1), tx)
            .await
            .unwrap();

        handle
            .disconnect(UserId::from("alice"), ConnectionId::new(1))
            .unwrap();

        assert_eq!(handle.stats().await.unwrap().connections, 0);
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_is_unavailable() {
        let handle = spawn_engine(SessionEngine::new(EngineConfig::default()));
        handle.shutdown().unwrap();

        let result = handle.stats().await;
        assert!(matches!(result, Err(RoomError::Unavailable)));
    }
}
