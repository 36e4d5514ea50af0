//! `PlayhubServer` builder and accept loop.
//!
//! This is the entry point for running the portal's game server. It ties
//! together all the layers: transport → protocol → session engine.

use std::sync::Arc;
use std::time::Duration;

use playhub_protocol::{Codec, JsonCodec};
use playhub_room::{
    EngineConfig, EngineHandle, LoggingCollaborator, MatchRecorder, PresenceNotifier, RoomError,
    SessionEngine, spawn_engine,
};
use playhub_session::Authenticator;
use playhub_transport::{Transport, WebSocketTransport};

use crate::PlayhubError;
use crate::handler::handle_connection;

/// Per-connection timing limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How long a connection may stay silent before it is dropped.
    pub idle_timeout: Duration,
    /// How long a new connection has to send `auth:hello`.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing in
/// here is mutable: all session state lives behind the engine handle.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) engine: EngineHandle,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a playhub server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use playhub::prelude::*;
///
/// # async fn start(auth: ApiKeyAuthenticator) -> Result<(), PlayhubError> {
/// let server = PlayhubServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .idle_timeout(Duration::from_secs(120))
///     .build(auth)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PlayhubServerBuilder {
    bind_addr: String,
    server_config: ServerConfig,
    engine_config: EngineConfig,
    recorder: Option<Arc<dyn MatchRecorder>>,
    presence: Option<Arc<dyn PresenceNotifier>>,
}

impl PlayhubServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            server_config: ServerConfig::default(),
            engine_config: EngineConfig::default(),
            recorder: None,
            presence: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a connection may stay silent.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.server_config.idle_timeout = timeout;
        self
    }

    /// Sets how long a new connection has to authenticate.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.server_config.handshake_timeout = timeout;
        self
    }

    /// Sets board sizes, the fleet catalogue and the battleship opening.
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Sets where finished matches are reported. Defaults to logging.
    pub fn recorder(mut self, recorder: impl MatchRecorder) -> Self {
        self.recorder = Some(Arc::new(recorder));
        self
    }

    /// Sets who hears about users coming online and going offline.
    /// Defaults to logging.
    pub fn presence(mut self, presence: impl PresenceNotifier) -> Self {
        self.presence = Some(Arc::new(presence));
        self
    }

    /// Binds the listener and spawns the session engine.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`. Must be called from
    /// within a Tokio runtime.
    ///
    /// # Errors
    /// Fails with `RoomError::InvalidConfig` before binding anything if
    /// the engine config is unplayable, or with a transport error if the
    /// address can't be bound.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<PlayhubServer<A, JsonCodec>, PlayhubError> {
        self.engine_config.validate().map_err(RoomError::from)?;
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let recorder = self
            .recorder
            .unwrap_or_else(|| Arc::new(LoggingCollaborator));
        let presence = self
            .presence
            .unwrap_or_else(|| Arc::new(LoggingCollaborator));
        let engine = spawn_engine(SessionEngine::with_collaborators(
            self.engine_config,
            recorder,
            presence,
        ));

        let state = Arc::new(ServerState {
            engine,
            auth,
            codec: JsonCodec,
            config: self.server_config,
        });

        Ok(PlayhubServer { transport, state })
    }
}

impl Default for PlayhubServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound playhub server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PlayhubServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> PlayhubServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> PlayhubServerBuilder {
        PlayhubServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the session engine, e.g. for reading stats.
    pub fn engine(&self) -> EngineHandle {
        self.state.engine.clone()
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task per accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), PlayhubError> {
        tracing::info!("playhub server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
