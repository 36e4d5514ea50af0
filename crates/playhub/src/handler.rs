//! Per-connection handler: handshake, auth, and message forwarding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `auth:hello` → authenticate the token → send `auth:welcome`
//!   2. Spawn a writer task that drains the user's outbox
//!   3. Register with the engine
//!   4. Loop: receive envelopes → forward to the engine

use std::sync::Arc;

use playhub_protocol::{Codec, Envelope, ProtocolError, UserId};
use playhub_room::EngineHandle;
use playhub_session::Authenticator;
use playhub_transport::{Connection, ConnectionId, WebSocketConnection};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::PlayhubError;
use crate::server::ServerState;

const HELLO: &str = "auth:hello";
const WELCOME: &str = "auth:welcome";
const AUTH_ERROR: &str = "auth:error";

#[derive(Deserialize)]
struct Hello {
    #[serde(default)]
    token: String,
}

/// Drop guard that reports the connection closed when the handler exits.
///
/// Runs even if the handler panics. `EngineHandle::disconnect` never
/// blocks, so it is safe to call from `Drop`.
struct SessionGuard {
    user: UserId,
    connection: ConnectionId,
    engine: EngineHandle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self
            .engine
            .disconnect(self.user.clone(), self.connection);
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), PlayhubError>
where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let user = perform_handshake(&conn, &state).await?;
    tracing::info!(%conn_id, %user, "user authenticated");

    let conn = Arc::new(conn);
    let (outbox, inbox) = mpsc::unbounded_channel();
    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), inbox));

    // Register and guard together: once connect returns, the guard is
    // the only thing that reports this connection closed.
    state.engine.connect(user.clone(), conn_id, outbox).await?;
    let _guard = SessionGuard {
        user: user.clone(),
        connection: conn_id,
        engine: state.engine.clone(),
    };

    loop {
        let data = match tokio::time::timeout(state.config.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%user, %conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%user, %conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%user, %conn_id, "connection timed out");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%user, error = %e, "failed to decode envelope");
                continue;
            }
        };

        state.engine.inbound(user.clone(), conn_id, envelope)?;
    }

    // _guard drops here → engine sees the disconnect.
    Ok(())
}

/// Receives `auth:hello`, authenticates, and answers with `auth:welcome`
/// or `auth:error`.
async fn perform_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
) -> Result<UserId, PlayhubError>
where
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(PlayhubError::Protocol(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )));
        }
        Ok(Err(e)) => return Err(PlayhubError::Transport(e)),
        Err(_) => {
            return Err(PlayhubError::Protocol(ProtocolError::InvalidMessage(
                "handshake timed out".into(),
            )));
        }
    };

    let envelope: Envelope = match state.codec.decode(&data) {
        Ok(env) => env,
        Err(e) => {
            reject(conn, &state.codec, "malformed handshake").await;
            return Err(e.into());
        }
    };

    if envelope.kind != HELLO {
        reject(conn, &state.codec, "expected auth:hello").await;
        return Err(PlayhubError::Protocol(ProtocolError::InvalidMessage(
            format!("first message must be {HELLO}, got {}", envelope.kind),
        )));
    }

    let hello: Hello = match envelope.decode_payload() {
        Ok(hello) => hello,
        Err(e) => {
            reject(conn, &state.codec, "malformed handshake").await;
            return Err(e.into());
        }
    };

    let user = match state.auth.authenticate(&hello.token).await {
        Ok(user) => user,
        Err(e) => {
            reject(conn, &state.codec, "unauthorized").await;
            return Err(PlayhubError::Session(e));
        }
    };

    let welcome = Envelope::new(WELCOME, json!({ "user": user }));
    let bytes = state.codec.encode(&welcome)?;
    conn.send(&bytes).await?;

    Ok(user)
}

/// Sends `auth:error` and closes. Best effort: the peer may already be gone.
async fn reject(conn: &WebSocketConnection, codec: &impl Codec, message: &str) {
    let envelope = Envelope::new(AUTH_ERROR, json!({ "message": message }));
    if let Ok(bytes) = codec.encode(&envelope) {
        let _ = conn.send(&bytes).await;
    }
    let _ = conn.close().await;
}

/// Drains the user's outbox onto the socket.
///
/// Ends when the engine drops the outbox sender (disconnect, or a newer
/// connection replaced this one) and closes the socket on the way out.
async fn write_loop<A, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<A, C>>,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
) where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    while let Some(envelope) = inbox.recv().await {
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound envelope");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
    let _ = conn.close().await;
    tracing::debug!(%conn_id, "writer stopped");
}
