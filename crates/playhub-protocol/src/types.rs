//! Core protocol types for playhub's wire format.
//!
//! Every type here either travels on the wire (envelopes, events, ids) or
//! is shared by every layer that builds wire messages (recipients, phases,
//! outcomes).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use uuid::Uuid;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable user identity (the portal username).
///
/// Newtype over `String` so a user can never be confused with a ticket
/// token or a room id. `#[serde(transparent)]` keeps it a plain JSON
/// string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A unique identifier for a room (one paired match, kept across rematches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Client-chosen token identifying one matchmaking request.
///
/// A leave carrying an older token must not cancel a newer request, so
/// the queue compares tokens before clearing a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketToken(pub String);

impl fmt::Display for TicketToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TicketToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// GameKind
// ---------------------------------------------------------------------------

/// The game variants the portal can pair players for.
///
/// The lowercase name doubles as the message-type prefix: `caro:move`,
/// `battleship:fire_shot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    /// Five-in-a-row on a 10×10 board.
    Caro,
    /// Naval combat on a 9×9 board.
    Battleship,
}

impl GameKind {
    /// Every supported variant.
    pub const ALL: [GameKind; 2] = [GameKind::Caro, GameKind::Battleship];

    /// The wire prefix for this game.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caro => "caro",
            Self::Battleship => "battleship",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caro" => Ok(Self::Caro),
            "battleship" => Ok(Self::Battleship),
            other => Err(ProtocolError::UnknownType(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Specifies who in a room should receive a server event.
///
/// Game modules return `(Recipient, ServerEvent)` pairs; the engine
/// resolves them against the room roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Both occupants.
    All,
    /// One specific occupant.
    User(UserId),
    /// Everyone except the given occupant.
    AllExcept(UserId),
}

impl Recipient {
    /// Returns `true` if `user` is addressed by this recipient.
    pub fn includes(&self, user: &UserId) -> bool {
        match self {
            Self::All => true,
            Self::User(target) => target == user,
            Self::AllExcept(excluded) => excluded != user,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase / Outcome
// ---------------------------------------------------------------------------

/// Coarse lifecycle stage of a room.
///
/// ```text
/// Placement (battleship only) → Playing (caro) / Combat (battleship) → Finished
///                    ↑                                                   │
///                    └──────────────────── rematch ──────────────────────┘
/// ```
///
/// The session engine understands nothing finer than this; everything
/// game-specific stays inside the game modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Both sides are privately submitting fleets.
    Placement,
    /// Caro turns are being played.
    Playing,
    /// Battleship shots are being fired.
    Combat,
    /// A terminal outcome was reached; only rematch/leave are meaningful.
    Finished,
}

impl Phase {
    /// Returns `true` once the room reached a terminal outcome.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns `true` if moves of any kind are still accepted.
    pub fn is_active(self) -> bool {
        !self.is_finished()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placement => write!(f, "placement"),
            Self::Playing => write!(f, "playing"),
            Self::Combat => write!(f, "combat"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// The game goes on.
    Continue,
    /// The game ended with a winner.
    Win { winner: UserId },
    /// The game ended with no winner.
    Draw,
}

impl Outcome {
    /// Returns `true` for `Win` and `Draw`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }

    /// The winner, if there is one.
    pub fn winner(&self) -> Option<&UserId> {
        match self {
            Self::Win { winner } => Some(winner),
            _ => None,
        }
    }
}

/// Why a `game_over` was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// A move produced a winner.
    Completed,
    /// The board filled up with no winner.
    Draw,
    /// The other player's connection dropped mid-game.
    OpponentDisconnected,
    /// The other player left the room mid-game.
    OpponentLeft,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Everything the server pushes to a player.
///
/// Serialized "adjacently tagged": `{ "type": "game_start", "payload": {...} }`.
/// [`Envelope::event`] then prefixes the type with the game name.
/// Field names are camelCase because the browser client reads them
/// directly.
///
/// `view` fields carry a game module's per-viewer JSON object and are
/// flattened into the payload, so the protocol layer never needs to know
/// what a caro board or a fleet looks like.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// The caller's ticket is parked in the queue.
    Waiting { ticket_token: TicketToken },

    /// A room was created, or reset by a rematch.
    GameStart {
        room_id: RoomId,
        opponent: UserId,
        is_my_turn: bool,
        #[serde(flatten)]
        view: Value,
    },

    /// The opponent submitted their fleet (battleship).
    OpponentReady {},

    /// Both fleets are placed; shooting begins (battleship).
    CombatStart { is_my_turn: bool },

    /// State after an accepted move, from the receiver's point of view.
    Update {
        #[serde(flatten)]
        view: Value,
        is_my_turn: bool,
        phase: Phase,
        outcome: Outcome,
    },

    /// The room reached a terminal outcome.
    GameOver {
        winner: Option<UserId>,
        reason: GameOverReason,
    },

    /// The opponent asked for a rematch.
    RematchRequested { from: UserId },

    /// The caller's rematch vote is recorded; waiting for the opponent.
    WaitingRematch {},

    /// The opponent declined (or walked away from) the rematch.
    RematchDeclined { from: UserId },
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A direct message between two users, relayed live as `chat:new_dm`.
///
/// Only the live relay exists here; transcripts are the portal's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: Uuid,
    pub sender: UserId,
    pub recipient: UserId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl DirectMessage {
    /// Stamps a new message with a fresh id and the current time.
    pub fn new(sender: UserId, recipient: UserId, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            recipient,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every message on the wire is an Envelope.
///
/// ```text
/// { "type": "caro:move", "payload": { "index": 42 } }
///    ────┬───  ──┬─               ──────┬──────
///   namespace  action              action-specific body
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `<namespace>:<action>`, e.g. `battleship:fire_shot` or `game:leave`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Action-specific body. Missing payloads decode as `null`.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Builds an envelope from a type string and a payload.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Wraps a server event for the given game, producing `<game>:<event>`.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the event's view can't be
    /// serialized.
    pub fn event(game: GameKind, event: &ServerEvent) -> Result<Self, ProtocolError> {
        let value = serde_json::to_value(event).map_err(ProtocolError::Encode)?;
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::InvalidMessage(
                "server event did not serialize to an object".into(),
            ));
        };
        let action = match fields.remove("type") {
            Some(Value::String(action)) => action,
            _ => {
                return Err(ProtocolError::InvalidMessage(
                    "server event is missing its type tag".into(),
                ));
            }
        };
        let payload = fields
            .remove("payload")
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Self {
            kind: format!("{game}:{action}"),
            payload,
        })
    }

    /// Wraps a relayed direct message as `chat:new_dm`.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the message can't be serialized.
    pub fn direct_message(message: &DirectMessage) -> Result<Self, ProtocolError> {
        let payload = serde_json::to_value(message).map_err(ProtocolError::Encode)?;
        Ok(Self::new("chat:new_dm", payload))
    }

    /// Splits the type into `(namespace, action)`.
    ///
    /// Returns `None` when there is no `:` separator.
    pub fn split_kind(&self) -> Option<(&str, &str)> {
        self.kind.split_once(':')
    }

    /// Decodes the payload into a typed body.
    ///
    /// A `null` payload is treated as an empty object, so bodies whose
    /// fields are all optional decode from `{"type": "..."}` alone.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the payload has the wrong shape.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let payload = match &self.payload {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        serde_json::from_value(payload).map_err(ProtocolError::Decode)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client reads these JSON shapes directly, so the tests
    //! pin field names and tags rather than round-tripping.

    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::from("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId(3).to_string(), "R-3");
    }

    #[test]
    fn test_game_kind_parses_wire_prefix() {
        assert_eq!("caro".parse::<GameKind>().unwrap(), GameKind::Caro);
        assert_eq!(
            "battleship".parse::<GameKind>().unwrap(),
            GameKind::Battleship
        );
        assert!(matches!(
            "chess".parse::<GameKind>(),
            Err(ProtocolError::UnknownType(_))
        ));
    }

    #[test]
    fn test_recipient_includes() {
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        assert!(Recipient::All.includes(&alice));
        assert!(Recipient::User(alice.clone()).includes(&alice));
        assert!(!Recipient::User(alice.clone()).includes(&bob));
        assert!(!Recipient::AllExcept(alice.clone()).includes(&alice));
        assert!(Recipient::AllExcept(alice).includes(&bob));
    }

    #[test]
    fn test_outcome_json_format() {
        let win = Outcome::Win {
            winner: UserId::from("bob"),
        };
        assert_eq!(
            serde_json::to_value(&win).unwrap(),
            json!({ "result": "win", "winner": "bob" })
        );
        assert_eq!(
            serde_json::to_value(Outcome::Continue).unwrap(),
            json!({ "result": "continue" })
        );
        assert!(win.is_terminal());
        assert!(Outcome::Draw.is_terminal());
        assert!(!Outcome::Continue.is_terminal());
    }

    #[test]
    fn test_event_envelope_prefixes_game_and_uses_camel_case() {
        let event = ServerEvent::Waiting {
            ticket_token: TicketToken::from("t-9"),
        };
        let env = Envelope::event(GameKind::Caro, &event).unwrap();
        assert_eq!(env.kind, "caro:waiting");
        assert_eq!(env.payload, json!({ "ticketToken": "t-9" }));
    }

    #[test]
    fn test_game_start_flattens_view_into_payload() {
        let event = ServerEvent::GameStart {
            room_id: RoomId(4),
            opponent: UserId::from("bob"),
            is_my_turn: true,
            view: json!({ "mySymbol": "X", "board": [null, null] }),
        };
        let env = Envelope::event(GameKind::Caro, &event).unwrap();
        assert_eq!(env.kind, "caro:game_start");
        assert_eq!(env.payload["roomId"], 4);
        assert_eq!(env.payload["opponent"], "bob");
        assert_eq!(env.payload["isMyTurn"], true);
        assert_eq!(env.payload["mySymbol"], "X");
        assert_eq!(env.payload["board"], json!([null, null]));
    }

    #[test]
    fn test_empty_event_has_object_payload() {
        let env =
            Envelope::event(GameKind::Battleship, &ServerEvent::OpponentReady {}).unwrap();
        assert_eq!(env.kind, "battleship:opponent_ready");
        assert_eq!(env.payload, json!({}));
    }

    #[test]
    fn test_game_over_reason_is_snake_case() {
        let event = ServerEvent::GameOver {
            winner: Some(UserId::from("alice")),
            reason: GameOverReason::OpponentDisconnected,
        };
        let env = Envelope::event(GameKind::Battleship, &event).unwrap();
        assert_eq!(env.kind, "battleship:game_over");
        assert_eq!(env.payload["winner"], "alice");
        assert_eq!(env.payload["reason"], "opponent_disconnected");
    }

    #[test]
    fn test_update_carries_phase_and_outcome() {
        let event = ServerEvent::Update {
            view: json!({ "winningLine": [0, 1, 2, 3, 4] }),
            is_my_turn: false,
            phase: Phase::Finished,
            outcome: Outcome::Win {
                winner: UserId::from("alice"),
            },
        };
        let env = Envelope::event(GameKind::Caro, &event).unwrap();
        assert_eq!(env.payload["phase"], "finished");
        assert_eq!(env.payload["outcome"]["result"], "win");
        assert_eq!(env.payload["winningLine"], json!([0, 1, 2, 3, 4]));
    }

    #[test]
    fn test_envelope_missing_payload_defaults_to_null() {
        let env: Envelope =
            serde_json::from_str(r#"{ "type": "caro:request_rematch" }"#).unwrap();
        assert_eq!(env.payload, Value::Null);
        assert_eq!(env.split_kind(), Some(("caro", "request_rematch")));
    }

    #[test]
    fn test_decode_payload_treats_null_as_empty_object() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            room_id: Option<u64>,
        }
        let env = Envelope::new("game:leave", Value::Null);
        let body: Body = env.decode_payload().unwrap();
        assert!(body.room_id.is_none());
    }

    #[test]
    fn test_decode_payload_wrong_shape_returns_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Body {
            index: usize,
        }
        let env = Envelope::new("caro:move", json!({ "index": "twelve" }));
        assert!(matches!(
            env.decode_payload::<Body>(),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_direct_message_envelope_shape() {
        let dm = DirectMessage::new(UserId::from("alice"), UserId::from("bob"), "gg");
        let env = Envelope::direct_message(&dm).unwrap();

        assert_eq!(env.kind, "chat:new_dm");
        assert_eq!(env.payload["sender"], "alice");
        assert_eq!(env.payload["recipient"], "bob");
        assert_eq!(env.payload["message"], "gg");
        assert_eq!(env.payload["id"], dm.id.to_string());
        assert!(env.payload["timestamp"].is_string());
    }

    #[test]
    fn test_direct_messages_get_distinct_ids() {
        let a = DirectMessage::new(UserId::from("alice"), UserId::from("bob"), "hi");
        let b = DirectMessage::new(UserId::from("alice"), UserId::from("bob"), "hi");
        assert_ne!(a.id, b.id);
    }
}
