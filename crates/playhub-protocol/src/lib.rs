//! Wire protocol for playhub.
//!
//! This crate defines the "language" that browsers and the server speak:
//!
//! - **Types** ([`Envelope`], [`ServerEvent`], [`UserId`], [`GameKind`], etc.):
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the session
//! engine. It doesn't know about connections, queues or rooms; game
//! specific views travel inside events as opaque JSON objects.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Engine (commands, rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    DirectMessage, Envelope, GameKind, GameOverReason, Outcome, Phase, Recipient, RoomId,
    ServerEvent, TicketToken, UserId,
};
