//! Inbound message → typed [`ClientCommand`].
//!
//! Message types are `<namespace>:<action>`. The namespace is a game
//! (`caro`, `battleship`), the game-agnostic `game` prefix used by
//! `game:leave`, or `chat`.

use playhub_protocol::{Envelope, GameKind, ProtocolError, RoomId, TicketToken, UserId};
use serde::Deserialize;

use crate::{BattleshipInput, CaroMove, GameInput, Ship};

/// Everything a connected user can ask the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `<game>:find_match{ticketToken}`
    FindMatch { game: GameKind, ticket: TicketToken },

    /// `<game>:leave{ticketToken}`: withdraw a waiting ticket.
    LeaveQueue { game: GameKind, ticket: TicketToken },

    /// `caro:move`, `battleship:place_ships`, `battleship:fire_shot`
    Move { game: GameKind, input: GameInput },

    /// `<game>:request_rematch{}`
    RequestRematch { game: GameKind },

    /// `<game>:decline_rematch{}`
    DeclineRematch { game: GameKind },

    /// `game:leave{roomId?}`: walk out of the current room.
    LeaveRoom { room_id: Option<RoomId> },

    /// `chat:dm{recipient, message}`: relay a direct message.
    DirectMessage { recipient: UserId, message: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketBody {
    ticket_token: TicketToken,
}

#[derive(Deserialize)]
struct FleetBody {
    #[serde(alias = "ships")]
    fleet: Vec<Ship>,
}

#[derive(Deserialize)]
struct ShotBody {
    index: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaveRoomBody {
    #[serde(default)]
    room_id: Option<RoomId>,
}

#[derive(Deserialize)]
struct DirectMessageBody {
    #[serde(default)]
    recipient: String,
    #[serde(default)]
    message: String,
}

impl TryFrom<&Envelope> for ClientCommand {
    type Error = ProtocolError;

    fn try_from(envelope: &Envelope) -> Result<Self, Self::Error> {
        let (namespace, action) = envelope
            .split_kind()
            .ok_or_else(|| ProtocolError::UnknownType(envelope.kind.clone()))?;

        if namespace == "game" {
            return match action {
                "leave" => {
                    let body: LeaveRoomBody = envelope.decode_payload()?;
                    Ok(Self::LeaveRoom {
                        room_id: body.room_id,
                    })
                }
                _ => Err(ProtocolError::UnknownType(envelope.kind.clone())),
            };
        }

        if namespace == "chat" {
            if action != "dm" {
                return Err(ProtocolError::UnknownType(envelope.kind.clone()));
            }
            let body: DirectMessageBody = envelope.decode_payload()?;
            if body.recipient.is_empty() || body.message.trim().is_empty() {
                return Err(ProtocolError::InvalidMessage(
                    "direct message needs a recipient and a message".into(),
                ));
            }
            return Ok(Self::DirectMessage {
                recipient: UserId(body.recipient),
                message: body.message,
            });
        }

        let game: GameKind = namespace
            .parse()
            .map_err(|_| ProtocolError::UnknownType(envelope.kind.clone()))?;

        let command = match (game, action) {
            (_, "find_match") => {
                let body: TicketBody = envelope.decode_payload()?;
                Self::FindMatch {
                    game,
                    ticket: body.ticket_token,
                }
            }
            (_, "leave") => {
                let body: TicketBody = envelope.decode_payload()?;
                Self::LeaveQueue {
                    game,
                    ticket: body.ticket_token,
                }
            }
            (_, "request_rematch") => Self::RequestRematch { game },
            (_, "decline_rematch") => Self::DeclineRematch { game },
            (GameKind::Caro, "move") => Self::Move {
                game,
                input: GameInput::Caro(envelope.decode_payload::<CaroMove>()?),
            },
            (GameKind::Battleship, "place_ships") => {
                let body: FleetBody = envelope.decode_payload()?;
                Self::Move {
                    game,
                    input: GameInput::Battleship(BattleshipInput::PlaceShips(body.fleet)),
                }
            }
            (GameKind::Battleship, "fire_shot") => {
                let body: ShotBody = envelope.decode_payload()?;
                Self::Move {
                    game,
                    input: GameInput::Battleship(BattleshipInput::FireShot(body.index)),
                }
            }
            _ => return Err(ProtocolError::UnknownType(envelope.kind.clone())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn parse(kind: &str, payload: Value) -> Result<ClientCommand, ProtocolError> {
        ClientCommand::try_from(&Envelope::new(kind, payload))
    }

    #[test]
    fn test_find_match_and_leave_carry_ticket() {
        assert_eq!(
            parse("caro:find_match", json!({ "ticketToken": "t1" })).unwrap(),
            ClientCommand::FindMatch {
                game: GameKind::Caro,
                ticket: TicketToken::from("t1"),
            }
        );
        assert_eq!(
            parse("battleship:leave", json!({ "ticketToken": "t2" })).unwrap(),
            ClientCommand::LeaveQueue {
                game: GameKind::Battleship,
                ticket: TicketToken::from("t2"),
            }
        );
    }

    #[test]
    fn test_find_match_without_token_is_malformed() {
        assert!(matches!(
            parse("caro:find_match", json!({})),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_moves_decode_per_game() {
        assert_eq!(
            parse("caro:move", json!({ "index": 42 })).unwrap(),
            ClientCommand::Move {
                game: GameKind::Caro,
                input: GameInput::Caro(CaroMove { index: 42 }),
            }
        );
        assert_eq!(
            parse("battleship:fire_shot", json!({ "index": 7 })).unwrap(),
            ClientCommand::Move {
                game: GameKind::Battleship,
                input: GameInput::Battleship(BattleshipInput::FireShot(7)),
            }
        );
    }

    #[test]
    fn test_place_ships_accepts_fleet_or_ships_key() {
        let fleet = json!([{ "id": "d1", "type": "destroyer", "positions": [0, 1] }]);
        for key in ["fleet", "ships"] {
            let cmd = parse("battleship:place_ships", json!({ key: fleet.clone() })).unwrap();
            let ships = match cmd {
                ClientCommand::Move {
                    input: GameInput::Battleship(BattleshipInput::PlaceShips(ships)),
                    ..
                } => ships,
                other => panic!("expected PlaceShips, got {other:?}"),
            };
            assert_eq!(ships[0].id, "d1");
            assert_eq!(ships[0].class, "destroyer");
            assert_eq!(ships[0].positions, vec![0, 1]);
        }
    }

    #[test]
    fn test_rematch_commands_take_no_payload() {
        assert_eq!(
            parse("caro:request_rematch", Value::Null).unwrap(),
            ClientCommand::RequestRematch {
                game: GameKind::Caro
            }
        );
        assert_eq!(
            parse("battleship:decline_rematch", json!({})).unwrap(),
            ClientCommand::DeclineRematch {
                game: GameKind::Battleship
            }
        );
    }

    #[test]
    fn test_game_leave_room_id_is_optional() {
        assert_eq!(
            parse("game:leave", json!({ "roomId": 3 })).unwrap(),
            ClientCommand::LeaveRoom {
                room_id: Some(RoomId(3))
            }
        );
        assert_eq!(
            parse("game:leave", Value::Null).unwrap(),
            ClientCommand::LeaveRoom { room_id: None }
        );
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        let kinds = [
            "caro:fire_shot",
            "battleship:move",
            "chess:find_match",
            "game:move",
            "chat:room_message",
            "nocolon",
        ];
        for kind in kinds {
            assert!(
                matches!(parse(kind, json!({})), Err(ProtocolError::UnknownType(_))),
                "{kind} should be unknown"
            );
        }
    }

    #[test]
    fn test_chat_dm_carries_recipient_and_text() {
        assert_eq!(
            parse("chat:dm", json!({ "recipient": "bob", "message": "rematch?" })).unwrap(),
            ClientCommand::DirectMessage {
                recipient: UserId::from("bob"),
                message: "rematch?".into(),
            }
        );
    }

    #[test]
    fn test_chat_dm_without_recipient_or_text_is_invalid() {
        for payload in [
            json!({ "message": "hi" }),
            json!({ "recipient": "bob" }),
            json!({ "recipient": "bob", "message": "   " }),
        ] {
            assert!(matches!(
                parse("chat:dm", payload),
                Err(ProtocolError::InvalidMessage(_))
            ));
        }
    }
}
