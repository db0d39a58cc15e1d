//! Session registry and coordination for two-player matchups.

mod coordinator;
mod error;
mod id;
mod model;
mod outcome;
mod registry;
mod stats;

pub use coordinator::SessionCoordinator;
pub use error::{AdmissionError, SessionError};
pub use id::{
    ConnectionId, RandomSessionIds, SESSION_ID_LEN, SequentialSessionIds, SessionId,
    SessionIdGenerator,
};
pub use model::{
    MAX_PARTICIPANTS, Participant, RosterEntry, Scores, Seat, Session, SessionPhase,
    SessionSummary,
};
pub use outcome::{ActionOutcome, IgnoreReason};
pub use registry::{Binding, SessionRegistry, SharedSession};
pub use stats::{PlayerStats, RoundResult};
