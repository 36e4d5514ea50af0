//! # playhub
//!
//! Real-time two-player session server for a browser game portal.
//!
//! Players connect over WebSocket, authenticate with an API key, and are
//! paired per game (caro or battleship). One session engine task owns
//! every queue slot and room; connection handlers only forward messages
//! to it and drain its replies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use playhub::prelude::*;
//!
//! # async fn start() -> Result<(), PlayhubError> {
//! playhub::init_tracing();
//!
//! let auth = ApiKeyAuthenticator::from_pairs("alice:k-1,bob:k-2")?;
//! let server = PlayhubServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(auth)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::PlayhubError;
pub use server::{PlayhubServer, PlayhubServerBuilder, ServerConfig};

/// Installs a `tracing` subscriber that writes to stdout.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this
/// more than once is harmless.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Everything needed to run a server, in one import.
pub mod prelude {
    pub use crate::{PlayhubError, PlayhubServer, PlayhubServerBuilder, ServerConfig};
    pub use playhub_protocol::{Envelope, GameKind, RoomId, TicketToken, UserId};
    pub use playhub_room::{
        ChannelCollaborator, CollaboratorEvent, ConfigError, EngineConfig, EngineHandle,
        EngineStats, LoggingCollaborator, MatchRecorder, Opening, PresenceNotifier, RoomError,
    };
    pub use playhub_session::{ApiKeyAuthenticator, Authenticator, SessionError};
}
