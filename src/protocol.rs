//! JSON message contract between connections and the coordinator.
//!
//! Every frame is an object with a kebab-case `type` tag and camelCase
//! fields, e.g. `{"type":"make-move","sessionId":"k3x9qa","cellIndex":4}`.

use crate::games::tictactoe::{Board, GameStatus, Mark};
use crate::session::{AdmissionError, Participant, PlayerStats, RosterEntry, Scores, Seat, Session, SessionId};
use serde::{Deserialize, Deserializer, Serialize};

/// Inbound action sent by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientAction {
    /// Join an existing session, or create one when no id is given.
    JoinSession {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        display_name: String,
    },
    /// Place the sender's mark.
    MakeMove {
        session_id: SessionId,
        /// `None` when the index is missing or not an integer; such a move
        /// is ignored like any other out-of-range index.
        #[serde(default, deserialize_with = "lenient_cell_index")]
        cell_index: Option<i64>,
    },
    /// Clear the board for the next round.
    ResetSession { session_id: SessionId },
    /// Give up the sender's seat.
    LeaveSession,
    /// Ask for the sender's win/loss/tie record.
    GetStats,
}

impl ClientAction {
    /// Message sent back when handling this action hits an internal fault.
    pub fn failure_message(&self) -> &'static str {
        match self {
            ClientAction::JoinSession { .. } => "Failed to join session",
            ClientAction::MakeMove { .. } => "Failed to make move",
            ClientAction::ResetSession { .. } => "Failed to reset session",
            ClientAction::LeaveSession => "Failed to leave session",
            ClientAction::GetStats => "Failed to load stats",
        }
    }
}

/// Accepts any JSON value, keeping it only if it is an integer in `i64` range.
fn lenient_cell_index<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::Value::deserialize(deserializer)?.as_i64())
}

/// Outbound event delivered to one connection or a whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Sent to a joiner with its assignment and the current state.
    Joined {
        session_id: SessionId,
        participant_index: Seat,
        symbol: Mark,
        display_name: String,
        board: Board,
        scores: Scores,
        turn: Seat,
        next_starter: Seat,
        roster: Vec<RosterEntry>,
    },
    /// Roster changed after a join.
    RosterUpdated {
        participant_count: usize,
        turn: Seat,
        roster: Vec<RosterEntry>,
    },
    /// Second seat filled; play can begin.
    RoundStarted {
        board: Board,
        turn: Seat,
        roster: Vec<RosterEntry>,
        next_starter: Seat,
    },
    /// A move was placed.
    MoveApplied {
        board: Board,
        turn: Seat,
        round_over: bool,
        outcome: GameStatus,
        scores: Scores,
        next_starter: Seat,
    },
    /// Board cleared for a new round.
    RoundReset {
        board: Board,
        turn: Seat,
        scores: Scores,
        roster: Vec<RosterEntry>,
        next_starter: Seat,
    },
    /// The other participant left; the session waits for a replacement.
    OpponentLeft,
    /// Join refused: both seats taken.
    SessionFull,
    /// Join refused: no such session.
    SessionNotFound,
    /// The receiver's running record.
    Stats { wins: u32, losses: u32, ties: u32 },
    /// An action failed internally.
    Error { message: String },
}

impl ServerEvent {
    pub(crate) fn joined(session: &Session, participant: &Participant) -> Self {
        ServerEvent::Joined {
            session_id: session.id().clone(),
            participant_index: *participant.seat(),
            symbol: participant.mark(),
            display_name: participant.display_name().clone(),
            board: session.board().clone(),
            scores: *session.scores(),
            turn: *session.turn(),
            next_starter: *session.next_starter(),
            roster: session.roster(),
        }
    }

    pub(crate) fn roster_updated(session: &Session) -> Self {
        ServerEvent::RosterUpdated {
            participant_count: session.participant_count(),
            turn: *session.turn(),
            roster: session.roster(),
        }
    }

    pub(crate) fn round_started(session: &Session) -> Self {
        ServerEvent::RoundStarted {
            board: session.board().clone(),
            turn: *session.turn(),
            roster: session.roster(),
            next_starter: *session.next_starter(),
        }
    }

    pub(crate) fn move_applied(session: &Session) -> Self {
        ServerEvent::MoveApplied {
            board: session.board().clone(),
            turn: *session.turn(),
            round_over: session.round_over(),
            outcome: *session.status(),
            scores: *session.scores(),
            next_starter: *session.next_starter(),
        }
    }

    pub(crate) fn round_reset(session: &Session) -> Self {
        ServerEvent::RoundReset {
            board: session.board().clone(),
            turn: *session.turn(),
            scores: *session.scores(),
            roster: session.roster(),
            next_starter: *session.next_starter(),
        }
    }

    pub(crate) fn stats(stats: &PlayerStats) -> Self {
        ServerEvent::Stats {
            wins: *stats.wins(),
            losses: *stats.losses(),
            ties: *stats.ties(),
        }
    }

    /// Generic failure notice.
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

impl From<AdmissionError> for ServerEvent {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::SessionFull => ServerEvent::SessionFull,
            AdmissionError::SessionNotFound => ServerEvent::SessionNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_join_without_session_id() {
        let action: ClientAction =
            serde_json::from_value(json!({"type": "join-session", "displayName": "Alice"})).unwrap();
        assert_eq!(
            action,
            ClientAction::JoinSession {
                session_id: None,
                display_name: "Alice".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_negative_cell_index() {
        let action: ClientAction = serde_json::from_value(
            json!({"type": "make-move", "sessionId": "abc123", "cellIndex": -1}),
        )
        .unwrap();
        assert!(matches!(
            action,
            ClientAction::MakeMove {
                cell_index: Some(-1),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_non_integer_cell_index() {
        for cell in [json!("4"), json!(1.5), json!(null), json!([4])] {
            let action: ClientAction = serde_json::from_value(
                json!({"type": "make-move", "sessionId": "abc123", "cellIndex": cell}),
            )
            .unwrap();
            assert!(
                matches!(action, ClientAction::MakeMove { cell_index: None, .. }),
                "cellIndex {cell}"
            );
        }

        let missing: ClientAction =
            serde_json::from_str(r#"{"type":"make-move","sessionId":"abc123"}"#).unwrap();
        assert!(matches!(missing, ClientAction::MakeMove { cell_index: None, .. }));

        let huge: ClientAction = serde_json::from_str(
            r#"{"type":"make-move","sessionId":"abc123","cellIndex":99999999999999999999}"#,
        )
        .unwrap();
        assert!(matches!(huge, ClientAction::MakeMove { cell_index: None, .. }));
    }

    #[test]
    fn test_parse_unit_actions() {
        let leave: ClientAction = serde_json::from_str(r#"{"type":"leave-session"}"#).unwrap();
        assert_eq!(leave, ClientAction::LeaveSession);
        let stats: ClientAction = serde_json::from_str(r#"{"type":"get-stats"}"#).unwrap();
        assert_eq!(stats, ClientAction::GetStats);
    }

    #[test]
    fn test_move_applied_wire_shape() {
        let event = ServerEvent::MoveApplied {
            board: Board::new(),
            turn: Seat::Second,
            round_over: true,
            outcome: GameStatus::Won(Mark::X),
            scores: Scores::default(),
            next_starter: Seat::Second,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "move-applied");
        assert_eq!(value["turn"], 1);
        assert_eq!(value["roundOver"], true);
        assert_eq!(value["outcome"], json!({"won": "X"}));
        assert_eq!(value["scores"], json!({"X": 0, "O": 0}));
        assert_eq!(value["nextStarter"], 1);
    }

    #[test]
    fn test_admission_errors_map_to_events() {
        let full = serde_json::to_value(ServerEvent::from(AdmissionError::SessionFull)).unwrap();
        assert_eq!(full, json!({"type": "session-full"}));
        let missing = serde_json::to_value(ServerEvent::from(AdmissionError::SessionNotFound)).unwrap();
        assert_eq!(missing, json!({"type": "session-not-found"}));
    }
}
