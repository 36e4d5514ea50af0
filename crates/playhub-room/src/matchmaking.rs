//! The matchmaking queue: at most one waiting ticket per game.

use std::collections::HashMap;

use playhub_protocol::{GameKind, TicketToken, UserId};

/// A waiting request to be paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub user: UserId,
    pub token: TicketToken,
}

/// What [`MatchmakingQueue::request_match`] did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRequest {
    /// The slot held a live ticket of another user. It has been consumed;
    /// the requester should be seated opposite `opponent`.
    Paired { opponent: Ticket },

    /// The requester's ticket is now the waiting one. `discarded` is the
    /// stale ticket it displaced, if any.
    Waiting { discarded: Option<Ticket> },
}

/// Per-game waiting slots.
///
/// The queue only stores tickets; liveness of the waiting user is asked of
/// the caller so the queue stays independent of the connection registry.
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    slots: HashMap<GameKind, Ticket>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs `user` with the waiting ticket for `game`, or parks them.
    ///
    /// - another user waiting and `is_live` for them → `Paired`, slot emptied
    /// - another user waiting but not live → their ticket is discarded and
    ///   the requester waits instead
    /// - empty slot, or the requester's own ticket → requester (re)parked
    ///   with the new token
    pub fn request_match(
        &mut self,
        game: GameKind,
        user: UserId,
        token: TicketToken,
        is_live: impl Fn(&UserId) -> bool,
    ) -> MatchRequest {
        let requester = Ticket { user, token };

        let discarded = match self.slots.remove(&game) {
            Some(waiting) if waiting.user != requester.user && is_live(&waiting.user) => {
                tracing::info!(
                    game = %game,
                    waiting = %waiting.user,
                    requester = %requester.user,
                    "tickets paired"
                );
                return MatchRequest::Paired { opponent: waiting };
            }
            Some(waiting) if waiting.user != requester.user => {
                tracing::debug!(game = %game, stale = %waiting.user, "discarding stale ticket");
                Some(waiting)
            }
            _ => None,
        };

        tracing::debug!(game = %game, user = %requester.user, "ticket waiting");
        self.slots.insert(game, requester);
        MatchRequest::Waiting { discarded }
    }

    /// Withdraws the waiting ticket for `game` if it is `user`'s and
    /// carries `token`. Returns `true` if a ticket was removed.
    pub fn leave_queue(&mut self, game: GameKind, user: &UserId, token: &TicketToken) -> bool {
        match self.slots.get(&game) {
            Some(waiting) if waiting.user == *user && waiting.token == *token => {
                self.slots.remove(&game);
                tracing::debug!(game = %game, %user, "ticket withdrawn");
                true
            }
            _ => false,
        }
    }

    /// Removes every ticket `user` holds, across all games.
    ///
    /// Returns how many were removed.
    pub fn withdraw_all(&mut self, user: &UserId) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, ticket| ticket.user != *user);
        before - self.slots.len()
    }

    /// The ticket currently waiting for `game`.
    pub fn waiting(&self, game: GameKind) -> Option<&Ticket> {
        self.slots.get(&game)
    }

    /// Number of waiting tickets.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
