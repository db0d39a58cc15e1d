//! Tic-tac-toe rooms library - real-time two-player sessions
//!
//! Coordinates turn-based matches between exactly two remote participants,
//! keeping scores across repeated rounds and alternating who opens each one.
//!
//! # Architecture
//!
//! - **Games**: pure board engine (win and full-board detection)
//! - **Session**: registry of live sessions and the per-session state machine
//! - **Protocol**: JSON actions in, events out
//! - **Hub**: per-connection outboxes grouped by session
//! - **Server**: axum WebSocket adapter and lobby listing
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tictactoe_rooms::{Hub, SessionCoordinator, SessionRegistry};
//!
//! let hub = Arc::new(Hub::new());
//! let coordinator = SessionCoordinator::new(Arc::new(SessionRegistry::new()), hub.clone());
//!
//! let (alice, _events) = hub.connect();
//! let outcome = coordinator.join(alice, None, "Alice").unwrap();
//! assert!(outcome.is_applied());
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod games;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod session;

// Crate-level exports - Configuration
pub use config::{ConfigError, ServerConfig};

// Crate-level exports - Board engine
pub use games::tictactoe::{
    Board, CELL_COUNT, GameStatus, Mark, Square, check_winner, is_draw, is_full,
};

// Crate-level exports - Messaging
pub use hub::{EventSink, Hub};
pub use protocol::{ClientAction, ServerEvent};

// Crate-level exports - Server
pub use server::{AppState, router};

// Crate-level exports - Session management
pub use session::{
    ActionOutcome, AdmissionError, ConnectionId, IgnoreReason, Participant, PlayerStats,
    RosterEntry, Scores, Seat, Session, SessionCoordinator, SessionError, SessionId,
    SessionIdGenerator, SessionPhase, SessionRegistry, SessionSummary, SequentialSessionIds,
};
