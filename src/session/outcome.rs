//! Result of handling one inbound action.

use super::error::AdmissionError;
use derive_more::Display;

/// What a transition did to shared state.
///
/// `Ignored` is a deliberate outcome, not a failure: clients act on the
/// last state they were sent, and a stale or illegal action is a harmless
/// race that changes nothing and emits nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ActionOutcome {
    /// State changed and events were emitted.
    #[display("applied")]
    Applied,
    /// Nothing changed and nothing was emitted.
    #[display("ignored: {}", _0)]
    Ignored(IgnoreReason),
    /// Join refused; only the requester was told.
    #[display("rejected: {}", _0)]
    Rejected(AdmissionError),
}

impl ActionOutcome {
    /// True when the action changed session state.
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}

/// Why an action was silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum IgnoreReason {
    /// The named session does not exist.
    #[display("unknown session")]
    UnknownSession,
    /// The connection is not seated anywhere.
    #[display("connection not bound to a session")]
    UnboundConnection,
    /// The connection is seated in a different session.
    #[display("connection belongs to another session")]
    ForeignSession,
    /// The session is waiting for players or its round is over.
    #[display("session not active")]
    NotActive,
    /// The other participant holds the turn.
    #[display("not this participant's turn")]
    NotYourTurn,
    /// Cell index outside 0..=8.
    #[display("cell index out of range")]
    CellOutOfRange,
    /// Cell already holds a mark.
    #[display("cell already occupied")]
    CellOccupied,
    /// Join requested for the session the connection already sits in.
    #[display("connection already seated in this session")]
    AlreadySeated,
    /// Reset requested while a seat is vacant.
    #[display("session needs two participants")]
    NotEnoughParticipants,
}
