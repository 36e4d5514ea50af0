//! Caro: five-in-a-row on a square board.
//!
//! X always opens. Seats keep their marks across rematches, so with the
//! default `Opening::FirstSeat` the player who was waiting in the queue is
//! X every game.

use playhub_protocol::{GameKind, Outcome, Phase, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::logic::{seat_of, update_plan};
use crate::{Applied, CaroConfig, GameModule, MoveRejection, Opening};

/// A player's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

/// `caro:move{index}`: place the mover's mark on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CaroMove {
    pub index: usize,
}

/// The full caro game.
#[derive(Debug, Clone)]
pub struct CaroState {
    size: usize,
    win_length: usize,
    board: Vec<Option<Mark>>,
    players: [UserId; 2],
    marks: [Mark; 2],
    to_move: Mark,
    phase: Phase,
    outcome: Outcome,
    winning_line: Vec<usize>,
}

impl CaroState {
    /// The mark `user` plays, if seated.
    pub fn mark_of(&self, user: &UserId) -> Option<Mark> {
        seat_of(&self.players, user).map(|seat| self.marks[seat])
    }

    /// Row-major board cells.
    pub fn board(&self) -> &[Option<Mark>] {
        &self.board
    }

    /// The five cells of the last winning line, empty otherwise.
    pub fn winning_line(&self) -> &[usize] {
        &self.winning_line
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn player_with(&self, mark: Mark) -> &UserId {
        if self.marks[0] == mark {
            &self.players[0]
        } else {
            &self.players[1]
        }
    }

    /// Scans the four directions through `index` for a run of `mark`.
    ///
    /// Returns exactly `win_length` cells, all of them `mark`, one of them
    /// `index`.
    fn line_through(&self, index: usize, mark: Mark) -> Option<Vec<usize>> {
        const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

        let size = self.size as isize;
        let row = (index / self.size) as isize;
        let col = (index % self.size) as isize;
        let need = self.win_length;

        let at = |r: isize, c: isize| -> Option<usize> {
            (r >= 0 && r < size && c >= 0 && c < size).then(|| (r * size + c) as usize)
        };
        let run = |dr: isize, dc: isize| -> usize {
            let mut steps = 0;
            while let Some(cell) = at(row + dr * (steps + 1), col + dc * (steps + 1)) {
                if self.board[cell] != Some(mark) {
                    break;
                }
                steps += 1;
            }
            steps as usize
        };

        for (dr, dc) in DIRECTIONS {
            let back = run(-dr, -dc);
            let forward = run(dr, dc);
            if back + forward + 1 < need {
                continue;
            }
            let start = back.min(need.saturating_sub(1)) as isize;
            let line = (0..need as isize)
                .filter_map(|i| at(row + dr * (i - start), col + dc * (i - start)))
                .collect::<Vec<_>>();
            return Some(line);
        }
        None
    }
}

/// The caro game module.
#[derive(Debug)]
pub struct CaroGame;

impl GameModule for CaroGame {
    const KIND: GameKind = GameKind::Caro;

    type Config = CaroConfig;
    type State = CaroState;
    type Input = CaroMove;

    fn create_initial_state(
        config: &CaroConfig,
        players: &[UserId; 2],
        opening: Opening,
    ) -> CaroState {
        let marks = match opening.first_seat() {
            0 => [Mark::X, Mark::O],
            _ => [Mark::O, Mark::X],
        };
        CaroState {
            size: config.board_size,
            win_length: config.win_length,
            board: vec![None; config.board_size * config.board_size],
            players: players.clone(),
            marks,
            to_move: Mark::X,
            phase: Phase::Playing,
            outcome: Outcome::Continue,
            winning_line: Vec::new(),
        }
    }

    fn apply_move(
        state: &mut CaroState,
        actor: &UserId,
        input: CaroMove,
    ) -> Result<Applied, MoveRejection> {
        if state.phase != Phase::Playing {
            return Err(MoveRejection::WrongPhase(state.phase));
        }
        let mark = state.mark_of(actor).ok_or(MoveRejection::NotAPlayer)?;
        if mark != state.to_move {
            return Err(MoveRejection::NotYourTurn);
        }
        let index = input.index;
        let cell = state
            .board
            .get_mut(index)
            .ok_or(MoveRejection::OutOfBounds(index))?;
        if cell.is_some() {
            return Err(MoveRejection::CellOccupied(index));
        }
        *cell = Some(mark);

        if let Some(line) = state.line_through(index, mark) {
            state.winning_line = line;
            state.phase = Phase::Finished;
            state.outcome = Outcome::Win {
                winner: actor.clone(),
            };
        } else if state.board.iter().all(Option::is_some) {
            state.phase = Phase::Finished;
            state.outcome = Outcome::Draw;
        } else {
            state.to_move = mark.other();
        }

        let plan = update_plan(
            &state.players,
            Self::turn(state),
            state.phase,
            &state.outcome,
            |viewer| Self::serialize_for(state, viewer),
        );
        Ok(Applied {
            outcome: state.outcome.clone(),
            plan,
        })
    }

    fn serialize_for(state: &CaroState, viewer: &UserId) -> Value {
        json!({
            "mySymbol": state.mark_of(viewer),
            "board": state.board,
            "boardSize": state.size,
            "winningLine": state.winning_line,
        })
    }

    fn phase(state: &CaroState) -> Phase {
        state.phase
    }

    fn turn(state: &CaroState) -> Option<&UserId> {
        (state.phase == Phase::Playing).then(|| state.player_with(state.to_move))
    }

    fn concede(state: &mut CaroState, loser: &UserId) -> Outcome {
        if state.phase != Phase::Finished {
            let winner = state
                .players
                .iter()
                .find(|p| *p != loser)
                .unwrap_or(&state.players[0])
                .clone();
            state.phase = Phase::Finished;
            state.outcome = Outcome::Win { winner };
        }
        state.outcome.clone()
    }
}
