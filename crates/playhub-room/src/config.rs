//! Engine configuration: board geometry, the battleship catalogue and who
//! opens.

use playhub_protocol::GameKind;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for a session engine instance.
///
/// Every field has a sensible default; override through struct update
/// syntax:
///
/// ```
/// use playhub_room::{EngineConfig, Opening};
///
/// let config = EngineConfig {
///     battleship_opening: Opening::FirstSeat,
///     ..EngineConfig::default()
/// };
/// assert_eq!(config.caro.board_size, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Five-in-a-row settings.
    pub caro: CaroConfig,

    /// Naval combat settings.
    pub battleship: BattleshipConfig,

    /// Which battleship seat fires first once both fleets are placed.
    pub battleship_opening: Opening,
}

impl EngineConfig {
    /// Checks that both games are playable with these settings.
    ///
    /// # Errors
    /// The first [`ConfigError`] found: an empty board, a caro win length
    /// of zero or longer than the board, or a ship class that is empty or
    /// longer than the battleship board.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let caro = &self.caro;
        if caro.board_size == 0 {
            return Err(ConfigError::EmptyBoard(GameKind::Caro));
        }
        if caro.win_length == 0 || caro.win_length > caro.board_size {
            return Err(ConfigError::WinLength {
                win_length: caro.win_length,
                board_size: caro.board_size,
            });
        }

        let battleship = &self.battleship;
        if battleship.board_size == 0 {
            return Err(ConfigError::EmptyBoard(GameKind::Battleship));
        }
        if let Some(class) = battleship
            .ships_to_place
            .iter()
            .find(|class| class.size == 0 || class.size > battleship.board_size)
        {
            return Err(ConfigError::ShipClass {
                name: class.name.clone(),
                size: class.size,
                board_size: battleship.board_size,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Per-game config
// ---------------------------------------------------------------------------

/// Caro board geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaroConfig {
    /// Side length of the square board.
    pub board_size: usize,

    /// How many marks in a row win.
    pub win_length: usize,
}

impl Default for CaroConfig {
    fn default() -> Self {
        Self {
            board_size: 10,
            win_length: 5,
        }
    }
}

/// Battleship board geometry and the advertised fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleshipConfig {
    /// Side length of the square board.
    pub board_size: usize,

    /// Fleet catalogue sent as `shipsToPlace` in `game_start`.
    ///
    /// Advisory only: any fleet that passes placement validation is
    /// accepted.
    pub ships_to_place: Vec<ShipClass>,
}

impl Default for BattleshipConfig {
    fn default() -> Self {
        Self {
            board_size: 9,
            ships_to_place: vec![
                ShipClass::new("carrier", 5, 1),
                ShipClass::new("battleship", 4, 2),
                ShipClass::new("cruiser", 3, 2),
                ShipClass::new("destroyer", 2, 1),
            ],
        }
    }
}

/// One entry of the fleet catalogue: a class name, its length and how many
/// of it a fleet should have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipClass {
    pub name: String,
    pub size: usize,
    pub count: usize,
}

impl ShipClass {
    pub fn new(name: impl Into<String>, size: usize, count: usize) -> Self {
        Self {
            name: name.into(),
            size,
            count,
        }
    }
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

/// Which seat makes the first move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opening {
    /// Seat 0 (the player who was waiting in the queue) opens.
    FirstSeat,
    /// A coin flip decides.
    #[default]
    Random,
}

impl Opening {
    /// Resolves the opening to a seat index (0 or 1).
    pub fn first_seat(self) -> usize {
        match self {
            Self::FirstSeat => 0,
            Self::Random => usize::from(rand::random_bool(0.5)),
        }
    }
}
