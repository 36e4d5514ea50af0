//! Matchmaking, game modules and the session engine for playhub.
//!
//! All session state lives in one [`SessionEngine`], driven by a single
//! actor task through an [`EngineHandle`]. Games plug in through the
//! [`GameModule`] trait; the engine only ever reaches them through the
//! [`GameVariantState`] union.
//!
//! # Key types
//!
//! - [`GameModule`]: the contract a game variant implements
//! - [`CaroGame`], [`BattleshipGame`]: the two variants
//! - [`MatchmakingQueue`]: one waiting ticket per game
//! - [`RoomTable`]: live rooms and who sits where
//! - [`SessionEngine`]: routes commands, runs the room lifecycle
//! - [`EngineHandle`]: send commands to the running engine actor
//! - [`MatchRecorder`], [`PresenceNotifier`]: side-effect collaborators
//! - [`EngineConfig`]: board sizes, fleet catalogue, battleship opening

mod actor;
mod battleship;
mod caro;
mod collab;
mod command;
mod config;
mod engine;
mod error;
mod logic;
mod matchmaking;
mod room;
mod variant;

pub use actor::{EngineHandle, spawn_engine};
pub use battleship::{
    BattleshipGame, BattleshipInput, BattleshipState, Ship, ShotReport, ShotResult, SunkShip,
};
pub use caro::{CaroGame, CaroMove, CaroState, Mark};
pub use collab::{
    ChannelCollaborator, CollaboratorEvent, LoggingCollaborator, MatchRecorder, PresenceNotifier,
};
pub use command::ClientCommand;
pub use config::{BattleshipConfig, CaroConfig, EngineConfig, Opening, ShipClass};
pub use engine::{EngineStats, SessionEngine};
pub use error::{ConfigError, FleetError, MoveRejection, RoomError};
pub use logic::{Applied, GameModule};
pub use matchmaking::{MatchRequest, MatchmakingQueue, Ticket};
pub use room::{GameRoom, RoomTable};
pub use variant::{GameInput, GameVariantState};
