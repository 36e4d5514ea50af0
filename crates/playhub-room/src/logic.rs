//! The `GameModule` trait: the contract every game variant implements.
//!
//! The session engine never looks inside a board or a fleet. It creates a
//! state, feeds it moves, reads back the coarse [`Phase`] and whose turn
//! it is, and forwards whatever events the module asks it to send.

use playhub_protocol::{GameKind, Outcome, Phase, Recipient, ServerEvent, UserId};
use serde_json::Value;

use crate::{MoveRejection, Opening};

/// What an accepted move produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// `Continue`, or the terminal outcome the move reached.
    pub outcome: Outcome,

    /// Events to deliver, each addressed relative to the room roster.
    pub plan: Vec<(Recipient, ServerEvent)>,
}

impl Applied {
    /// An accepted move that ends nothing.
    pub fn continuing(plan: Vec<(Recipient, ServerEvent)>) -> Self {
        Self {
            outcome: Outcome::Continue,
            plan,
        }
    }
}

/// The trait each game variant implements.
///
/// Associated types define the shape of the game's data:
/// - `Config`: board geometry and similar knobs
/// - `State`: the whole game (boards, turn pointer, outcome)
/// - `Input`: what a player can send once seated
///
/// All functions are synchronous and deterministic given their inputs,
/// except where `Opening::Random` is resolved in `create_initial_state`.
pub trait GameModule: Send + Sync + 'static {
    /// Which variant this module implements.
    const KIND: GameKind;

    type Config: Send + Sync + Clone + Default;
    type State: Send + Sync + Clone + std::fmt::Debug;
    type Input: Send + std::fmt::Debug;

    /// Creates a fresh game for `players` (seat 0, seat 1).
    ///
    /// Called once when a pair is matched and again on every rematch.
    fn create_initial_state(
        config: &Self::Config,
        players: &[UserId; 2],
        opening: Opening,
    ) -> Self::State;

    /// Validates and applies a move by `actor`.
    ///
    /// # Errors
    /// Returns a [`MoveRejection`] without touching `state` if the phase
    /// doesn't accept the input, `actor` isn't on turn, or the target is
    /// invalid.
    fn apply_move(
        state: &mut Self::State,
        actor: &UserId,
        input: Self::Input,
    ) -> Result<Applied, MoveRejection>;

    /// The game as `viewer` is allowed to see it, as a JSON object.
    ///
    /// Flattened into `game_start` and `update` payloads.
    fn serialize_for(state: &Self::State, viewer: &UserId) -> Value;

    /// Coarse lifecycle stage.
    fn phase(state: &Self::State) -> Phase;

    /// The player expected to move next, if turns are being taken.
    fn turn(state: &Self::State) -> Option<&UserId>;

    /// Ends the game with `loser` forfeiting. Returns the forced outcome.
    fn concede(state: &mut Self::State, loser: &UserId) -> Outcome;
}

/// Index of `user` in a two-seat roster.
pub(crate) fn seat_of(players: &[UserId; 2], user: &UserId) -> Option<usize> {
    players.iter().position(|p| p == user)
}

/// Builds the per-seat `update` events every module sends after a move.
///
/// `view` is called once per seat so each side gets its own projection.
pub(crate) fn update_plan(
    players: &[UserId; 2],
    turn: Option<&UserId>,
    phase: Phase,
    outcome: &Outcome,
    mut view: impl FnMut(&UserId) -> Value,
) -> Vec<(Recipient, ServerEvent)> {
    players
        .iter()
        .map(|player| {
            let event = ServerEvent::Update {
                view: view(player),
                is_my_turn: turn == Some(player),
                phase,
                outcome: outcome.clone(),
            };
            (Recipient::User(player.clone()), event)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roster() -> [UserId; 2] {
        [UserId::from("alice"), UserId::from("bob")]
    }

    #[test]
    fn test_seat_of() {
        let players = roster();
        assert_eq!(seat_of(&players, &UserId::from("alice")), Some(0));
        assert_eq!(seat_of(&players, &UserId::from("bob")), Some(1));
        assert_eq!(seat_of(&players, &UserId::from("carol")), None);
    }

    #[test]
    fn test_update_plan_addresses_each_seat_with_own_turn_flag() {
        let players = roster();
        let plan = update_plan(
            &players,
            Some(&players[1]),
            Phase::Playing,
            &Outcome::Continue,
            |viewer| json!({ "viewer": viewer }),
        );

        assert_eq!(plan.len(), 2);
        let (to, event) = &plan[0];
        assert_eq!(*to, Recipient::User(players[0].clone()));
        match event {
            ServerEvent::Update {
                view, is_my_turn, ..
            } => {
                assert_eq!(view["viewer"], "alice");
                assert!(!is_my_turn);
            }
            other => panic!("expected Update, got {other:?}"),
        }
        assert!(matches!(
            plan[1].1,
            ServerEvent::Update {
                is_my_turn: true,
                ..
            }
        ));
    }
}
