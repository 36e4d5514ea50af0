//! Side-effect collaborators: match history/rewards and friend presence.
//!
//! The engine calls these synchronously and never waits on their result,
//! so implementations must return quickly: log, push onto a channel, or
//! `tokio::spawn` the real work.

use playhub_protocol::{GameKind, UserId};
use tokio::sync::mpsc;

/// Records a finished match with a winner (history and rewards).
pub trait MatchRecorder: Send + Sync + 'static {
    fn record_match_result(&self, winner: &UserId, loser: &UserId, game: GameKind);
}

/// Tells a user's friends that they came online or went offline.
pub trait PresenceNotifier: Send + Sync + 'static {
    fn notify_friends_presence(&self, user: &UserId, online: bool);
}

/// Default collaborator: writes every call to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCollaborator;

impl MatchRecorder for LoggingCollaborator {
    fn record_match_result(&self, winner: &UserId, loser: &UserId, game: GameKind) {
        tracing::info!(%winner, %loser, game = %game, "match result recorded");
    }
}

impl PresenceNotifier for LoggingCollaborator {
    fn notify_friends_presence(&self, user: &UserId, online: bool) {
        tracing::info!(%user, online, "presence changed");
    }
}

/// One collaborator call, as seen by a [`ChannelCollaborator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorEvent {
    MatchRecorded {
        winner: UserId,
        loser: UserId,
        game: GameKind,
    },
    Presence {
        user: UserId,
        online: bool,
    },
}

/// Forwards every call onto an unbounded channel.
///
/// Useful as a hand-off point to a background worker, and in tests for
/// asserting exactly which side effects happened.
#[derive(Debug, Clone)]
pub struct ChannelCollaborator {
    sender: mpsc::UnboundedSender<CollaboratorEvent>,
}

impl ChannelCollaborator {
    /// Creates the collaborator and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CollaboratorEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn push(&self, event: CollaboratorEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("collaborator channel closed, dropping event");
        }
    }
}

impl MatchRecorder for ChannelCollaborator {
    fn record_match_result(&self, winner: &UserId, loser: &UserId, game: GameKind) {
        self.push(CollaboratorEvent::MatchRecorded {
            winner: winner.clone(),
            loser: loser.clone(),
            game,
        });
    }
}

impl PresenceNotifier for ChannelCollaborator {
    fn notify_friends_presence(&self, user: &UserId, online: bool) {
        self.push(CollaboratorEvent::Presence {
            user: user.clone(),
            online,
        });
    }
}
