//! `GameVariantState`: the one place the engine picks a game module.

use playhub_protocol::{GameKind, Outcome, Phase, UserId};
use serde_json::Value;

use crate::{
    Applied, BattleshipGame, BattleshipInput, BattleshipState, CaroGame, CaroMove, CaroState,
    EngineConfig, GameModule, MoveRejection, Opening,
};

/// A move for either game, decoded from a room-scoped message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameInput {
    Caro(CaroMove),
    Battleship(BattleshipInput),
}

impl GameInput {
    /// The game this input belongs to.
    pub fn kind(&self) -> GameKind {
        match self {
            Self::Caro(_) => GameKind::Caro,
            Self::Battleship(_) => GameKind::Battleship,
        }
    }
}

/// Live state of a room, tagged by variant.
#[derive(Debug, Clone)]
pub enum GameVariantState {
    Caro(CaroState),
    Battleship(BattleshipState),
}

impl GameVariantState {
    /// Builds a fresh game of `kind` for the given seats.
    ///
    /// Caro always opens with seat 0; battleship follows
    /// `config.battleship_opening`.
    pub fn create(kind: GameKind, config: &EngineConfig, players: &[UserId; 2]) -> Self {
        match kind {
            GameKind::Caro => Self::Caro(CaroGame::create_initial_state(
                &config.caro,
                players,
                Opening::FirstSeat,
            )),
            GameKind::Battleship => Self::Battleship(BattleshipGame::create_initial_state(
                &config.battleship,
                players,
                config.battleship_opening,
            )),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            Self::Caro(_) => CaroGame::KIND,
            Self::Battleship(_) => BattleshipGame::KIND,
        }
    }

    /// Routes `input` to the matching module.
    ///
    /// # Errors
    /// [`MoveRejection::WrongGame`] if the input is for the other variant,
    /// otherwise whatever the module rejects with.
    pub fn apply_move(
        &mut self,
        actor: &UserId,
        input: GameInput,
    ) -> Result<Applied, MoveRejection> {
        match (self, input) {
            (Self::Caro(state), GameInput::Caro(input)) => {
                CaroGame::apply_move(state, actor, input)
            }
            (Self::Battleship(state), GameInput::Battleship(input)) => {
                BattleshipGame::apply_move(state, actor, input)
            }
            _ => Err(MoveRejection::WrongGame),
        }
    }

    pub fn serialize_for(&self, viewer: &UserId) -> Value {
        match self {
            Self::Caro(state) => CaroGame::serialize_for(state, viewer),
            Self::Battleship(state) => BattleshipGame::serialize_for(state, viewer),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Caro(state) => CaroGame::phase(state),
            Self::Battleship(state) => BattleshipGame::phase(state),
        }
    }

    pub fn turn(&self) -> Option<&UserId> {
        match self {
            Self::Caro(state) => CaroGame::turn(state),
            Self::Battleship(state) => BattleshipGame::turn(state),
        }
    }

    pub fn concede(&mut self, loser: &UserId) -> Outcome {
        match self {
            Self::Caro(state) => CaroGame::concede(state, loser),
            Self::Battleship(state) => BattleshipGame::concede(state, loser),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> [UserId; 2] {
        [UserId::from("alice"), UserId::from("bob")]
    }

    #[test]
    fn test_create_picks_module_by_kind() {
        let config = EngineConfig::default();
        let caro = GameVariantState::create(GameKind::Caro, &config, &players());
        let ship = GameVariantState::create(GameKind::Battleship, &config, &players());

        assert_eq!(caro.kind(), GameKind::Caro);
        assert_eq!(caro.phase(), Phase::Playing);
        assert_eq!(caro.turn(), Some(&UserId::from("alice")));
        assert_eq!(ship.kind(), GameKind::Battleship);
        assert_eq!(ship.phase(), Phase::Placement);
    }

    #[test]
    fn test_mismatched_input_is_rejected() {
        let config = EngineConfig::default();
        let mut caro = GameVariantState::create(GameKind::Caro, &config, &players());

        let result = caro.apply_move(
            &UserId::from("alice"),
            GameInput::Battleship(BattleshipInput::FireShot(3)),
        );

        assert_eq!(result, Err(MoveRejection::WrongGame));
        assert_eq!(caro.turn(), Some(&UserId::from("alice")));
    }
}
