//! Battleship: private fleet placement, then alternating shots.
//!
//! ```text
//! Placement ──(both fleets in)──→ Combat ──(a fleet fully sunk)──→ Finished
//! ```
//!
//! A miss passes the turn; a hit or a sink lets the shooter fire again.

use std::collections::HashSet;

use playhub_protocol::{GameKind, Outcome, Phase, Recipient, ServerEvent, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::logic::{seat_of, update_plan};
use crate::{
    Applied, BattleshipConfig, FleetError, GameModule, MoveRejection, Opening, ShipClass,
};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One ship of a submitted fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    /// Client-chosen id, unique within the fleet.
    pub id: String,

    /// Class name, echoed back when the ship is sunk.
    #[serde(rename = "type", default)]
    pub class: String,

    /// Board cells the ship covers.
    pub positions: Vec<usize>,
}

/// What a seated battleship player can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleshipInput {
    /// `battleship:place_ships{fleet}`.
    PlaceShips(Vec<Ship>),
    /// `battleship:fire_shot{index}`.
    FireShot(usize),
}

// ---------------------------------------------------------------------------
// Shot reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotResult {
    Miss,
    Hit,
    Sunk,
}

/// The class and cells of a ship that just went down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SunkShip {
    #[serde(rename = "type")]
    pub class: String,
    pub positions: Vec<usize>,
}

/// Attached to both players' `update` after a shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotReport {
    pub hitter: UserId,
    pub target_index: usize,
    pub result: ShotResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_info: Option<SunkShip>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    /// Index into the owning side's `ships`.
    ship: Option<usize>,
    hit: bool,
}

/// One player's waters.
#[derive(Debug, Clone)]
struct Side {
    board: Vec<Cell>,
    ships: Vec<Ship>,
    ready: bool,
}

impl Side {
    fn empty(cells: usize) -> Self {
        Self {
            board: vec![Cell::default(); cells],
            ships: Vec::new(),
            ready: false,
        }
    }

    fn is_sunk(&self, ship: usize) -> bool {
        self.ships[ship].positions.iter().all(|&p| self.board[p].hit)
    }

    fn fleet_destroyed(&self) -> bool {
        (0..self.ships.len()).all(|ship| self.is_sunk(ship))
    }

    /// Own board: ship ids plus incoming hits.
    fn own_view(&self) -> Vec<Value> {
        self.board
            .iter()
            .map(|cell| {
                json!({
                    "shipId": cell.ship.map(|s| self.ships[s].id.as_str()),
                    "isHit": cell.hit,
                })
            })
            .collect()
    }

    /// Opponent's board as seen by the shooter: only shot results.
    fn fog_view(&self) -> Vec<Option<ShotResult>> {
        self.board
            .iter()
            .map(|cell| match (cell.hit, cell.ship) {
                (false, _) => None,
                (true, None) => Some(ShotResult::Miss),
                (true, Some(ship)) if self.is_sunk(ship) => Some(ShotResult::Sunk),
                (true, Some(_)) => Some(ShotResult::Hit),
            })
            .collect()
    }
}

/// The full battleship game.
#[derive(Debug, Clone)]
pub struct BattleshipState {
    size: usize,
    ships_to_place: Vec<ShipClass>,
    players: [UserId; 2],
    sides: [Side; 2],
    /// Seat that fires first once combat starts.
    opener: usize,
    turn: usize,
    phase: Phase,
    outcome: Outcome,
}

impl BattleshipState {
    fn cells(&self) -> usize {
        self.size * self.size
    }

    /// Returns `true` once `user` has submitted a fleet.
    pub fn is_ready(&self, user: &UserId) -> bool {
        seat_of(&self.players, user).is_some_and(|seat| self.sides[seat].ready)
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Checks a fleet against the board without touching any state.
    ///
    /// Each ship must cover a straight, gap-free run of cells along one
    /// row or one column, and no two ships may share a cell.
    pub fn validate_fleet(&self, fleet: &[Ship]) -> Result<(), FleetError> {
        if fleet.is_empty() {
            return Err(FleetError::Empty);
        }
        let cells = self.cells();
        let mut ids = HashSet::new();
        let mut covered = HashSet::new();

        for ship in fleet {
            if ship.positions.is_empty() {
                return Err(FleetError::EmptyShip(ship.id.clone()));
            }
            if !ids.insert(ship.id.as_str()) {
                return Err(FleetError::DuplicateId(ship.id.clone()));
            }
            if let Some(&cell) = ship.positions.iter().find(|&&p| p >= cells) {
                return Err(FleetError::OutOfBounds {
                    id: ship.id.clone(),
                    cell,
                });
            }
            for &cell in &ship.positions {
                if !covered.insert(cell) {
                    return Err(FleetError::Overlap(cell));
                }
            }
            if !is_straight_run(&ship.positions, self.size) {
                return Err(FleetError::NotStraight(ship.id.clone()));
            }
        }
        Ok(())
    }

    fn place(&mut self, seat: usize, fleet: Vec<Ship>) {
        let mut side = Side::empty(self.cells());
        for (index, ship) in fleet.iter().enumerate() {
            for &cell in &ship.positions {
                side.board[cell].ship = Some(index);
            }
        }
        side.ships = fleet;
        side.ready = true;
        self.sides[seat] = side;
    }
}

/// Positions (in any order) form one horizontal or vertical segment.
fn is_straight_run(positions: &[usize], size: usize) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    let first = sorted[0];
    let (row, col) = (first / size, first % size);

    let horizontal = sorted
        .iter()
        .enumerate()
        .all(|(i, &p)| p / size == row && p % size == col + i);
    let vertical = sorted
        .iter()
        .enumerate()
        .all(|(i, &p)| p % size == col && p / size == row + i);
    horizontal || vertical
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// The battleship game module.
#[derive(Debug)]
pub struct BattleshipGame;

impl BattleshipGame {
    fn place_ships(
        state: &mut BattleshipState,
        actor: &UserId,
        fleet: Vec<Ship>,
    ) -> Result<Applied, MoveRejection> {
        if state.phase != Phase::Placement {
            return Err(MoveRejection::WrongPhase(state.phase));
        }
        let seat = seat_of(&state.players, actor).ok_or(MoveRejection::NotAPlayer)?;
        if state.sides[seat].ready {
            return Err(MoveRejection::AlreadyReady);
        }
        state.validate_fleet(&fleet)?;
        state.place(seat, fleet);

        let other = 1 - seat;
        if !state.sides[other].ready {
            return Ok(Applied::continuing(vec![(
                Recipient::AllExcept(actor.clone()),
                ServerEvent::OpponentReady {},
            )]));
        }

        state.phase = Phase::Combat;
        state.turn = state.opener;
        let plan = state
            .players
            .iter()
            .enumerate()
            .map(|(seat, player)| {
                (
                    Recipient::User(player.clone()),
                    ServerEvent::CombatStart {
                        is_my_turn: seat == state.turn,
                    },
                )
            })
            .collect();
        Ok(Applied::continuing(plan))
    }

    fn fire_shot(
        state: &mut BattleshipState,
        actor: &UserId,
        index: usize,
    ) -> Result<Applied, MoveRejection> {
        if state.phase != Phase::Combat {
            return Err(MoveRejection::WrongPhase(state.phase));
        }
        let seat = seat_of(&state.players, actor).ok_or(MoveRejection::NotAPlayer)?;
        if seat != state.turn {
            return Err(MoveRejection::NotYourTurn);
        }
        let target = &mut state.sides[1 - seat];
        let cell = target
            .board
            .get_mut(index)
            .ok_or(MoveRejection::OutOfBounds(index))?;
        if cell.hit {
            return Err(MoveRejection::AlreadyFired(index));
        }
        cell.hit = true;
        let struck = cell.ship;

        let (result, ship_info) = match struck {
            None => (ShotResult::Miss, None),
            Some(ship) if target.is_sunk(ship) => {
                let sunk = &target.ships[ship];
                let info = SunkShip {
                    class: sunk.class.clone(),
                    positions: sunk.positions.clone(),
                };
                (ShotResult::Sunk, Some(info))
            }
            Some(_) => (ShotResult::Hit, None),
        };

        if target.fleet_destroyed() {
            state.phase = Phase::Finished;
            state.outcome = Outcome::Win {
                winner: actor.clone(),
            };
        } else if result == ShotResult::Miss {
            state.turn = 1 - seat;
        }

        let report = ShotReport {
            hitter: actor.clone(),
            target_index: index,
            result,
            ship_info,
        };
        let shot = serde_json::to_value(&report).unwrap_or(Value::Null);
        let plan = update_plan(
            &state.players,
            Self::turn(state),
            state.phase,
            &state.outcome,
            |viewer| {
                let mut view = Self::serialize_for(state, viewer);
                if let Value::Object(fields) = &mut view {
                    fields.insert("shot".into(), shot.clone());
                }
                view
            },
        );
        Ok(Applied {
            outcome: state.outcome.clone(),
            plan,
        })
    }
}

impl GameModule for BattleshipGame {
    const KIND: GameKind = GameKind::Battleship;

    type Config = BattleshipConfig;
    type State = BattleshipState;
    type Input = BattleshipInput;

    fn create_initial_state(
        config: &BattleshipConfig,
        players: &[UserId; 2],
        opening: Opening,
    ) -> BattleshipState {
        let cells = config.board_size * config.board_size;
        BattleshipState {
            size: config.board_size,
            ships_to_place: config.ships_to_place.clone(),
            players: players.clone(),
            sides: [Side::empty(cells), Side::empty(cells)],
            opener: opening.first_seat(),
            turn: 0,
            phase: Phase::Placement,
            outcome: Outcome::Continue,
        }
    }

    fn apply_move(
        state: &mut BattleshipState,
        actor: &UserId,
        input: BattleshipInput,
    ) -> Result<Applied, MoveRejection> {
        match input {
            BattleshipInput::PlaceShips(fleet) => Self::place_ships(state, actor, fleet),
            BattleshipInput::FireShot(index) => Self::fire_shot(state, actor, index),
        }
    }

    fn serialize_for(state: &BattleshipState, viewer: &UserId) -> Value {
        let Some(seat) = seat_of(&state.players, viewer) else {
            return Value::Object(Map::new());
        };
        let ships_to_place: Map<String, Value> = state
            .ships_to_place
            .iter()
            .map(|class| {
                (
                    class.name.clone(),
                    json!({ "size": class.size, "count": class.count }),
                )
            })
            .collect();
        let (mine, theirs) = (&state.sides[seat], &state.sides[1 - seat]);
        json!({
            "boardSize": state.size,
            "shipsToPlace": ships_to_place,
            "ready": mine.ready,
            "opponentReady": theirs.ready,
            "myBoard": mine.own_view(),
            "opponentBoard": theirs.fog_view(),
        })
    }

    fn phase(state: &BattleshipState) -> Phase {
        state.phase
    }

    fn turn(state: &BattleshipState) -> Option<&UserId> {
        (state.phase == Phase::Combat).then(|| &state.players[state.turn])
    }

    fn concede(state: &mut BattleshipState, loser: &UserId) -> Outcome {
        if state.phase != Phase::Finished {
            let loser_seat = seat_of(&state.players, loser).unwrap_or(1);
            state.phase = Phase::Finished;
            state.outcome = Outcome::Win {
                winner: state.players[1 - loser_seat].clone(),
            };
        }
        state.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::from("alice")
    }

    fn bob() -> UserId {
        UserId::from("bob")
    }

    fn new_game() -> BattleshipState {
        BattleshipGame::create_initial_state(
            &BattleshipConfig::default(),
            &[alice(), bob()],
            Opening::FirstSeat,
        )
    }

    fn ship(id: &str, class: &str, positions: &[usize]) -> Ship {
        Ship {
            id: id.into(),
            class: class.into(),
            positions: positions.to_vec(),
        }
    }

    fn place(state: &mut BattleshipState, who: &UserId, fleet: Vec<Ship>) -> Applied {
        BattleshipGame::apply_move(state, who, BattleshipInput::PlaceShips(fleet)).unwrap()
    }

    fn fire(state: &mut BattleshipState, who: &UserId, index: usize) -> Applied {
        BattleshipGame::apply_move(state, who, BattleshipInput::FireShot(index)).unwrap()
    }

    fn shot_of(applied: &Applied) -> Value {
        match &applied.plan[0].1 {
            ServerEvent::Update { view, .. } => view["shot"].clone(),
            other => panic!("expected Update, got {other:?}"),
        }
    }

    /// Both sides placed; alice fires first.
    fn in_combat() -> BattleshipState {
        let mut state = new_game();
        place(&mut state, &alice(), vec![ship("a1", "destroyer", &[0, 1])]);
        place(&mut state, &bob(), vec![ship("b1", "destroyer", &[10, 11])]);
        state
    }

    #[test]
    fn test_initial_state_is_placement_with_no_turn() {
        let state = new_game();
        assert_eq!(BattleshipGame::phase(&state), Phase::Placement);
        assert_eq!(BattleshipGame::turn(&state), None);
        let view = BattleshipGame::serialize_for(&state, &alice());
        assert_eq!(view["shipsToPlace"]["carrier"]["size"], 5);
        assert_eq!(view["shipsToPlace"]["battleship"]["count"], 2);
        assert_eq!(view["myBoard"].as_array().unwrap().len(), 81);
    }

    #[test]
    fn test_first_fleet_notifies_opponent_only() {
        let mut state = new_game();
        let applied = place(&mut state, &alice(), vec![ship("a1", "destroyer", &[0, 1])]);

        assert_eq!(
            applied.plan,
            vec![(
                Recipient::AllExcept(alice()),
                ServerEvent::OpponentReady {}
            )]
        );
        assert!(state.is_ready(&alice()));
        assert_eq!(BattleshipGame::phase(&state), Phase::Placement);
    }

    #[test]
    fn test_second_fleet_starts_combat() {
        let mut state = new_game();
        place(&mut state, &alice(), vec![ship("a1", "destroyer", &[0, 1])]);
        let applied = place(&mut state, &bob(), vec![ship("b1", "cruiser", &[0, 9, 18])]);

        assert_eq!(BattleshipGame::phase(&state), Phase::Combat);
        assert_eq!(BattleshipGame::turn(&state), Some(&alice()));
        assert_eq!(
            applied.plan,
            vec![
                (
                    Recipient::User(alice()),
                    ServerEvent::CombatStart { is_my_turn: true }
                ),
                (
                    Recipient::User(bob()),
                    ServerEvent::CombatStart { is_my_turn: false }
                ),
            ]
        );
    }

    #[test]
    fn test_fleet_validation() {
        let state = new_game();
        let check = |fleet: Vec<Ship>| state.validate_fleet(&fleet);

        assert_eq!(check(vec![]), Err(FleetError::Empty));
        assert_eq!(
            check(vec![ship("s", "x", &[])]),
            Err(FleetError::EmptyShip("s".into()))
        );
        assert_eq!(
            check(vec![ship("s", "x", &[0, 1]), ship("s", "x", &[20, 21])]),
            Err(FleetError::DuplicateId("s".into()))
        );
        assert_eq!(
            check(vec![ship("s", "x", &[80, 81])]),
            Err(FleetError::OutOfBounds {
                id: "s".into(),
                cell: 81
            })
        );
        assert_eq!(
            check(vec![ship("s", "x", &[0, 1]), ship("t", "x", &[1, 10])]),
            Err(FleetError::Overlap(1))
        );
        // Row wrap: 8 is the last cell of row 0, 9 the first of row 1.
        assert_eq!(
            check(vec![ship("s", "x", &[8, 9])]),
            Err(FleetError::NotStraight("s".into()))
        );
        assert_eq!(
            check(vec![ship("s", "x", &[0, 2])]),
            Err(FleetError::NotStraight("s".into()))
        );
        assert_eq!(
            check(vec![ship("s", "x", &[0, 10])]),
            Err(FleetError::NotStraight("s".into()))
        );
        assert_eq!(check(vec![ship("s", "x", &[18, 0, 9])]), Ok(()));
    }

    #[test]
    fn test_rejected_fleet_leaves_player_unready() {
        let mut state = new_game();
        let result = BattleshipGame::apply_move(
            &mut state,
            &alice(),
            BattleshipInput::PlaceShips(vec![ship("s", "x", &[0, 2])]),
        );
        assert!(matches!(result, Err(MoveRejection::InvalidFleet(_))));
        assert!(!state.is_ready(&alice()));
    }

    #[test]
    fn test_second_submission_is_rejected() {
        let mut state = new_game();
        place(&mut state, &alice(), vec![ship("a1", "destroyer", &[0, 1])]);
        let again = BattleshipGame::apply_move(
            &mut state,
            &alice(),
            BattleshipInput::PlaceShips(vec![ship("a2", "destroyer", &[3, 4])]),
        );
        assert_eq!(again, Err(MoveRejection::AlreadyReady));
    }

    #[test]
    fn test_shots_rejected_during_placement() {
        let mut state = new_game();
        let result =
            BattleshipGame::apply_move(&mut state, &alice(), BattleshipInput::FireShot(0));
        assert_eq!(result, Err(MoveRejection::WrongPhase(Phase::Placement)));
    }

    #[test]
    fn test_miss_passes_turn() {
        let mut state = in_combat();
        let applied = fire(&mut state, &alice(), 40);

        assert_eq!(shot_of(&applied)["result"], "miss");
        assert_eq!(BattleshipGame::turn(&state), Some(&bob()));
        assert_eq!(
            BattleshipGame::apply_move(&mut state, &alice(), BattleshipInput::FireShot(41)),
            Err(MoveRejection::NotYourTurn)
        );
    }

    #[test]
    fn test_hit_then_sunk_then_win() {
        let mut state = in_combat();

        let hit = fire(&mut state, &alice(), 10);
        assert_eq!(shot_of(&hit)["result"], "hit");
        assert_eq!(hit.outcome, Outcome::Continue);
        assert_eq!(BattleshipGame::turn(&state), Some(&alice()));

        let sunk = fire(&mut state, &alice(), 11);
        let shot = shot_of(&sunk);
        assert_eq!(shot["result"], "sunk");
        assert_eq!(shot["shipInfo"]["type"], "destroyer");
        assert_eq!(shot["shipInfo"]["positions"], json!([10, 11]));
        assert_eq!(sunk.outcome, Outcome::Win { winner: alice() });
        assert_eq!(BattleshipGame::phase(&state), Phase::Finished);
    }

    #[test]
    fn test_repeat_shot_is_rejected() {
        let mut state = in_combat();
        fire(&mut state, &alice(), 10);
        assert_eq!(
            BattleshipGame::apply_move(&mut state, &alice(), BattleshipInput::FireShot(10)),
            Err(MoveRejection::AlreadyFired(10))
        );
        assert_eq!(
            BattleshipGame::apply_move(&mut state, &alice(), BattleshipInput::FireShot(81)),
            Err(MoveRejection::OutOfBounds(81))
        );
    }

    #[test]
    fn test_views_hide_unhit_ships() {
        let mut state = in_combat();
        fire(&mut state, &alice(), 10);

        let alice_view = BattleshipGame::serialize_for(&state, &alice());
        assert_eq!(alice_view["opponentBoard"][10], "hit");
        assert_eq!(alice_view["opponentBoard"][11], Value::Null);
        assert_eq!(alice_view["myBoard"][0]["shipId"], "a1");

        let bob_view = BattleshipGame::serialize_for(&state, &bob());
        assert_eq!(bob_view["myBoard"][10]["isHit"], true);
        assert_eq!(bob_view["opponentBoard"][0], Value::Null);
    }

    #[test]
    fn test_concede_awards_the_other_seat() {
        let mut state = in_combat();
        assert_eq!(
            BattleshipGame::concede(&mut state, &bob()),
            Outcome::Win { winner: alice() }
        );
        assert_eq!(BattleshipGame::turn(&state), None);
    }
}
