//! Connection registry and authentication for playhub.
//!
//! This crate answers two questions for the session engine:
//!
//! 1. **Who is this?** The [`Authenticator`] trait turns a handshake
//!    token into a [`UserId`](playhub_protocol::UserId).
//! 2. **How do I reach them?** The [`ConnectionRegistry`] maps each
//!    identity to its single live connection's outbox.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session engine (above)  ← delivers events through the registry
//!     ↕
//! Session layer (this crate)  ← identity → live connection
//!     ↕
//! Protocol / transport (below)  ← Envelope, ConnectionId
//! ```

mod auth;
mod error;
mod registry;
mod session;

pub use auth::{ApiKeyAuthenticator, Authenticator};
pub use error::SessionError;
pub use registry::ConnectionRegistry;
pub use session::{Outbox, Session};
