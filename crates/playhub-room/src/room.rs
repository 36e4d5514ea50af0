//! Rooms and the room table.
//!
//! A room is one paired match, kept alive across rematches. The table
//! owns every room plus the reverse index user → room, and keeps the two
//! consistent: a player points at a room only while it exists and they
//! have not walked out of it.

use std::collections::{HashMap, HashSet};

use playhub_protocol::{GameKind, Phase, RoomId, UserId};

use crate::GameVariantState;

/// A live match between two players.
#[derive(Debug)]
pub struct GameRoom {
    pub id: RoomId,
    pub game: GameKind,
    /// Seat 0 is the player who was waiting in the queue.
    pub players: [UserId; 2],
    pub state: GameVariantState,
    /// Set once the current game's termination has been handled.
    pub settled: bool,
    pub rematch_votes: HashSet<UserId>,
    /// The occupant who already walked out of the finished game.
    pub departed: Option<UserId>,
}

impl GameRoom {
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// `true` if `user` is on the roster and has not walked out.
    pub fn contains(&self, user: &UserId) -> bool {
        self.players.contains(user) && self.departed.as_ref() != Some(user)
    }

    /// The other occupant, if `user` is one of the two.
    pub fn opponent_of(&self, user: &UserId) -> Option<&UserId> {
        match &self.players {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }
}

/// All rooms, plus which room each seated user is in.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomId, GameRoom>,
    seats: HashMap<UserId, RoomId>,
    next_id: u64,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room for `players` and seats both of them.
    pub fn create(&mut self, players: [UserId; 2], state: GameVariantState) -> RoomId {
        self.next_id += 1;
        let id = RoomId(self.next_id);
        for player in &players {
            self.seats.insert(player.clone(), id);
        }
        let game = state.kind();
        tracing::info!(
            room_id = %id,
            game = %game,
            seat0 = %players[0],
            seat1 = %players[1],
            "room created"
        );
        self.rooms.insert(
            id,
            GameRoom {
                id,
                game,
                players,
                state,
                settled: false,
                rematch_votes: HashSet::new(),
                departed: None,
            },
        );
        id
    }

    /// The room `user` is seated in.
    ///
    /// A reference to a room that no longer exists, or whose roster no
    /// longer lists the user, is cleared and reported as "not seated".
    pub fn seated_room(&mut self, user: &UserId) -> Option<RoomId> {
        let room_id = *self.seats.get(user)?;
        match self.rooms.get(&room_id) {
            Some(room) if room.contains(user) => Some(room_id),
            _ => {
                tracing::debug!(%user, %room_id, "clearing stale room reference");
                self.seats.remove(user);
                None
            }
        }
    }

    pub fn get(&self, id: RoomId) -> Option<&GameRoom> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut GameRoom> {
        self.rooms.get_mut(&id)
    }

    /// Clears `user`'s reference to room `id`, leaving the room itself.
    pub fn unseat(&mut self, user: &UserId, id: RoomId) {
        if self.seats.get(user) == Some(&id) {
            self.seats.remove(user);
        }
    }

    /// Deletes a room and clears both players' references to it.
    pub fn remove(&mut self, id: RoomId) -> Option<GameRoom> {
        let room = self.rooms.remove(&id)?;
        for player in &room.players {
            if self.seats.get(player) == Some(&id) {
                self.seats.remove(player);
            }
        }
        tracing::info!(room_id = %id, game = %room.game, "room destroyed");
        Some(room)
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Number of users currently seated.
    pub fn seated(&self) -> usize {
        self.seats.len()
    }
}
