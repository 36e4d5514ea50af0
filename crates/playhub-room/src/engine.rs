//! The session engine: matchmaking, move routing and room lifecycle.
//!
//! `SessionEngine` is plain synchronous state. It owns the connection
//! registry, the matchmaking queue and the room table, and is driven one
//! command at a time by the engine actor (see [`spawn_engine`]). Nothing
//! here is shared, so nothing here is locked.
//!
//! # Room lifecycle
//!
//! ```text
//!            find_match × 2
//!                  │
//!                  ▼
//!   ┌──── Placement / Playing / Combat ────┐
//!   │              │                       │ disconnect / game:leave
//!   │     terminal outcome (settle)        │   → survivor wins, room deleted
//!   │              ▼                       │
//!   │          Finished ───────────────────┘
//!   │              │
//!   │   both request_rematch → fresh state, same room id
//!   │   first decline / leave / disconnect → leaver unseated
//!   │   second departure → room deleted
//!   └──────────────┘
//! ```
//!
//! [`spawn_engine`]: crate::spawn_engine

use std::sync::Arc;

use playhub_protocol::{
    DirectMessage, Envelope, GameKind, GameOverReason, Outcome, Recipient, RoomId, ServerEvent, TicketToken,
    UserId,
};
use playhub_session::{ConnectionRegistry, Outbox};
use playhub_transport::ConnectionId;

use crate::{
    ClientCommand, EngineConfig, GameInput, GameVariantState, LoggingCollaborator, MatchRecorder,
    MatchRequest, MatchmakingQueue, PresenceNotifier, RoomError, RoomTable,
};

/// A snapshot of engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Registered connections.
    pub connections: usize,
    /// Tickets waiting in the matchmaking queue.
    pub waiting_tickets: usize,
    /// Live rooms.
    pub rooms: usize,
    /// Users seated in a room.
    pub seated: usize,
}

/// All session state for one server.
pub struct SessionEngine {
    config: EngineConfig,
    registry: ConnectionRegistry,
    queue: MatchmakingQueue,
    rooms: RoomTable,
    recorder: Arc<dyn MatchRecorder>,
    presence: Arc<dyn PresenceNotifier>,
}

impl SessionEngine {
    /// Creates an engine that logs collaborator calls.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(LoggingCollaborator),
            Arc::new(LoggingCollaborator),
        )
    }

    pub fn with_collaborators(
        config: EngineConfig,
        recorder: Arc<dyn MatchRecorder>,
        presence: Arc<dyn PresenceNotifier>,
    ) -> Self {
        Self {
            config,
            registry: ConnectionRegistry::new(),
            queue: MatchmakingQueue::new(),
            rooms: RoomTable::new(),
            recorder,
            presence,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &MatchmakingQueue {
        &self.queue
    }

    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            connections: self.registry.len(),
            waiting_tickets: self.queue.len(),
            rooms: self.rooms.len(),
            seated: self.rooms.seated(),
        }
    }

    // -----------------------------------------------------------------
    // Connection events
    // -----------------------------------------------------------------

    /// Registers an authenticated connection.
    ///
    /// Friends are told the user is online only on a first login; a
    /// replacing connection is silent.
    pub fn connect(&mut self, user: UserId, connection: ConnectionId, outbox: Outbox) {
        let replaced = self.registry.register(user.clone(), connection, outbox);
        if replaced.is_none() {
            self.presence.notify_friends_presence(&user, true);
        }
    }

    /// Handles the close of `connection`.
    ///
    /// Ignored if the user has since logged in on a newer connection.
    /// Otherwise the user's tickets are withdrawn and any room they sit
    /// in is resolved as if they left.
    pub fn disconnect(&mut self, user: &UserId, connection: ConnectionId) {
        if !self.registry.unregister(user, connection) {
            return;
        }
        self.queue.withdraw_all(user);
        if let Some(room_id) = self.rooms.seated_room(user) {
            self.vacate(room_id, user, GameOverReason::OpponentDisconnected);
        }
        self.presence.notify_friends_presence(user, false);
    }

    /// Handles one inbound envelope from `user` on `connection`.
    ///
    /// Malformed, unknown or out-of-place messages change nothing and are
    /// only logged.
    pub fn handle_inbound(&mut self, user: &UserId, connection: ConnectionId, envelope: &Envelope) {
        if let Err(error) = self.route(user, connection, envelope) {
            tracing::debug!(%user, kind = %envelope.kind, %error, "command ignored");
        }
    }

    fn route(
        &mut self,
        user: &UserId,
        connection: ConnectionId,
        envelope: &Envelope,
    ) -> Result<(), RoomError> {
        match self.registry.get(user) {
            Some(session) if session.connection == connection => {}
            _ => return Err(RoomError::StaleConnection(user.clone())),
        }
        let command = ClientCommand::try_from(envelope)?;
        self.dispatch(user, command)
    }

    /// Executes a parsed command for `user`.
    ///
    /// # Errors
    /// Any [`RoomError`] describes why the command was ignored; state is
    /// unchanged in that case.
    pub fn dispatch(&mut self, user: &UserId, command: ClientCommand) -> Result<(), RoomError> {
        match command {
            ClientCommand::FindMatch { game, ticket } => self.find_match(user, game, ticket),
            ClientCommand::LeaveQueue { game, ticket } => {
                if !self.queue.leave_queue(game, user, &ticket) {
                    tracing::debug!(%user, game = %game, "no matching ticket to withdraw");
                }
                Ok(())
            }
            ClientCommand::Move { game, input } => self.play(user, game, input),
            ClientCommand::RequestRematch { game } => self.request_rematch(user, game),
            ClientCommand::DeclineRematch { game } => self.decline_rematch(user, game),
            ClientCommand::LeaveRoom { room_id } => self.leave_room(user, room_id),
            ClientCommand::DirectMessage { recipient, message } => {
                self.relay_direct_message(user, recipient, message)
            }
        }
    }

    // -----------------------------------------------------------------
    // Matchmaking
    // -----------------------------------------------------------------

    fn find_match(
        &mut self,
        user: &UserId,
        game: GameKind,
        ticket: TicketToken,
    ) -> Result<(), RoomError> {
        if let Some(room_id) = self.rooms.seated_room(user) {
            let abandoned = self
                .rooms
                .get(room_id)
                .is_some_and(|room| room.departed.is_some());
            if !abandoned {
                return Err(RoomError::AlreadySeated(user.clone(), room_id));
            }
            self.depart(room_id, user);
        }

        let registry = &self.registry;
        let request =
            self.queue
                .request_match(game, user.clone(), ticket.clone(), |u| registry.is_live(u));

        match request {
            MatchRequest::Paired { opponent } => {
                self.queue.withdraw_all(&opponent.user);
                self.queue.withdraw_all(user);
                self.open_room(game, [opponent.user, user.clone()]);
            }
            MatchRequest::Waiting { .. } => {
                self.deliver(game, user, &ServerEvent::Waiting {
                    ticket_token: ticket,
                });
            }
        }
        Ok(())
    }

    fn open_room(&mut self, game: GameKind, players: [UserId; 2]) {
        let state = GameVariantState::create(game, &self.config, &players);
        let room_id = self.rooms.create(players, state);
        self.announce_start(room_id);
    }

    /// Sends each occupant a `game_start` with their own view.
    fn announce_start(&self, room_id: RoomId) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let [first, second] = &room.players;
        for (me, opponent) in [(first, second), (second, first)] {
            let event = ServerEvent::GameStart {
                room_id,
                opponent: opponent.clone(),
                is_my_turn: room.state.turn() == Some(me),
                view: room.state.serialize_for(me),
            };
            self.deliver(room.game, me, &event);
        }
    }

    // -----------------------------------------------------------------
    // Play
    // -----------------------------------------------------------------

    fn play(&mut self, user: &UserId, game: GameKind, input: GameInput) -> Result<(), RoomError> {
        let room_id = self.seat_for(user, game)?;
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotSeated(user.clone()))?;
        let applied = room.state.apply_move(user, input)?;

        // The result is on record before any client can see the final board.
        let game_over = self.settle(room_id, applied.outcome);
        self.deliver_plan(room_id, &applied.plan);
        if let Some(event) = game_over {
            self.deliver_plan(room_id, &[(Recipient::All, event)]);
        }
        Ok(())
    }

    /// Closes out a game that reached a terminal outcome through play.
    ///
    /// Runs at most once per game. A win is recorded here, draws are not.
    /// Returns the `game_over` event for the caller to deliver, or `None`
    /// if the outcome is `Continue` or the game was already settled.
    fn settle(&mut self, room_id: RoomId, outcome: Outcome) -> Option<ServerEvent> {
        let (winner, reason) = match outcome {
            Outcome::Continue => return None,
            Outcome::Win { winner } => (Some(winner), GameOverReason::Completed),
            Outcome::Draw => (None, GameOverReason::Draw),
        };
        let room = self.rooms.get_mut(room_id)?;
        if room.settled {
            return None;
        }
        room.settled = true;
        let game = room.game;

        if let Some(winner) = &winner {
            if let Some(loser) = room.opponent_of(winner) {
                self.recorder.record_match_result(winner, loser, game);
            }
        }
        tracing::info!(
            %room_id,
            game = %game,
            winner = winner.as_ref().map(UserId::as_str).unwrap_or("-"),
            "game over"
        );
        Some(ServerEvent::GameOver { winner, reason })
    }

    // -----------------------------------------------------------------
    // Leaving and rematch
    // -----------------------------------------------------------------

    fn leave_room(&mut self, user: &UserId, claimed: Option<RoomId>) -> Result<(), RoomError> {
        let room_id = self
            .rooms
            .seated_room(user)
            .ok_or_else(|| RoomError::NotSeated(user.clone()))?;
        if let Some(claimed) = claimed.filter(|claimed| *claimed != room_id) {
            return Err(RoomError::RoomMismatch {
                claimed,
                actual: room_id,
            });
        }
        self.vacate(room_id, user, GameOverReason::OpponentLeft);
        Ok(())
    }

    /// `user` walks out of `room_id`, voluntarily or by disconnecting.
    ///
    /// Mid-game the other occupant wins by forfeit and is the only one
    /// told, and the room is deleted. After the game it is a rematch
    /// refusal; see [`depart`](Self::depart).
    fn vacate(&mut self, room_id: RoomId, user: &UserId, reason: GameOverReason) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        if room.phase().is_finished() {
            self.depart(room_id, user);
            return;
        }

        let outcome = room.state.concede(user);
        let already_settled = std::mem::replace(&mut room.settled, true);
        let game = room.game;
        let survivor = room.opponent_of(user).cloned();
        self.rooms.remove(room_id);

        let Some(survivor) = survivor else {
            return;
        };
        if already_settled || outcome.winner() != Some(&survivor) {
            return;
        }
        tracing::info!(%room_id, game = %game, %survivor, quitter = %user, "game forfeited");
        self.recorder.record_match_result(&survivor, user, game);
        self.deliver(game, &survivor, &ServerEvent::GameOver {
            winner: Some(survivor.clone()),
            reason,
        });
    }

    /// `leaver` walks out of a finished room.
    ///
    /// The first occupant to go is unseated and the room stays for the
    /// other one, who is told the rematch is off if a vote was pending.
    /// The last occupant to go deletes the room.
    fn depart(&mut self, room_id: RoomId, leaver: &UserId) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        if room.departed.is_some() {
            self.rooms.remove(room_id);
            return;
        }

        let vote_pending = !room.rematch_votes.is_empty();
        room.rematch_votes.clear();
        room.departed = Some(leaver.clone());
        let game = room.game;
        let other = room.opponent_of(leaver).cloned();
        self.rooms.unseat(leaver, room_id);
        tracing::debug!(%room_id, %leaver, "left finished room");

        if let Some(other) = other.filter(|_| vote_pending) {
            self.deliver(game, &other, &ServerEvent::RematchDeclined {
                from: leaver.clone(),
            });
        }
    }

    fn decline_rematch(&mut self, user: &UserId, game: GameKind) -> Result<(), RoomError> {
        let room_id = self.finished_seat_for(user, game)?;
        self.depart(room_id, user);
        Ok(())
    }

    fn request_rematch(&mut self, user: &UserId, game: GameKind) -> Result<(), RoomError> {
        let room_id = self.finished_seat_for(user, game)?;
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotSeated(user.clone()))?;

        if let Some(leaver) = room.departed.clone() {
            self.rooms.remove(room_id);
            self.deliver(game, user, &ServerEvent::RematchDeclined { from: leaver });
            return Ok(());
        }

        if !room.rematch_votes.insert(user.clone()) {
            tracing::debug!(%room_id, %user, "duplicate rematch vote");
            return Ok(());
        }

        if room.rematch_votes.len() < room.players.len() {
            let opponent = room.opponent_of(user).cloned();
            if let Some(opponent) = opponent {
                self.deliver(game, &opponent, &ServerEvent::RematchRequested {
                    from: user.clone(),
                });
            }
            self.deliver(game, user, &ServerEvent::WaitingRematch {});
            return Ok(());
        }

        room.state = GameVariantState::create(room.game, &self.config, &room.players);
        room.settled = false;
        room.rematch_votes.clear();
        tracing::info!(%room_id, game = %game, "rematch started");
        self.announce_start(room_id);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------

    /// Relays a direct message to `recipient` and echoes it to `sender`.
    ///
    /// An offline recipient simply misses it; nothing is stored.
    fn relay_direct_message(
        &self,
        sender: &UserId,
        recipient: UserId,
        message: String,
    ) -> Result<(), RoomError> {
        let dm = DirectMessage::new(sender.clone(), recipient, message);
        let envelope = Envelope::direct_message(&dm)?;

        if dm.recipient != *sender {
            if let Err(error) = self.registry.send(&dm.recipient, envelope.clone()) {
                tracing::debug!(%sender, recipient = %dm.recipient, %error, "direct message not delivered");
            }
        }
        if let Err(error) = self.registry.send(sender, envelope) {
            tracing::warn!(%sender, %error, "direct message echo undeliverable");
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Lookups and delivery
    // -----------------------------------------------------------------

    /// The room `user` sits in, provided it plays `game`.
    fn seat_for(&mut self, user: &UserId, game: GameKind) -> Result<RoomId, RoomError> {
        let room_id = self
            .rooms
            .seated_room(user)
            .ok_or_else(|| RoomError::NotSeated(user.clone()))?;
        let expected = self
            .rooms
            .get(room_id)
            .map(|room| room.game)
            .ok_or_else(|| RoomError::NotSeated(user.clone()))?;
        if expected != game {
            return Err(RoomError::WrongGame {
                room: room_id,
                expected,
                got: game,
            });
        }
        Ok(room_id)
    }

    /// Like [`seat_for`](Self::seat_for), but the game must be over.
    fn finished_seat_for(&mut self, user: &UserId, game: GameKind) -> Result<RoomId, RoomError> {
        let room_id = self.seat_for(user, game)?;
        match self.rooms.get(room_id).map(|room| room.phase()) {
            Some(phase) if phase.is_finished() => Ok(room_id),
            Some(phase) => Err(RoomError::WrongPhase(room_id, phase)),
            None => Err(RoomError::NotSeated(user.clone())),
        }
    }

    /// Resolves a broadcast plan against the room roster.
    fn deliver_plan(&self, room_id: RoomId, plan: &[(Recipient, ServerEvent)]) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        for (recipient, event) in plan {
            for player in room.players.iter().filter(|p| recipient.includes(p)) {
                self.deliver(room.game, player, event);
            }
        }
    }

    fn deliver(&self, game: GameKind, user: &UserId, event: &ServerEvent) {
        let envelope = match Envelope::event(game, event) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(%user, %error, "failed to encode event");
                return;
            }
        };
        if let Err(error) = self.registry.send(user, envelope) {
            tracing::warn!(%user, %error, "event undeliverable");
        }
    }
}
