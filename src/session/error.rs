//! Session error types.

use derive_more::{Display, Error};
use std::sync::PoisonError;
use tracing::instrument;

/// Reason a join request was turned away.
///
/// Admission errors are reported to the requesting connection only;
/// the targeted session is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Error)]
pub enum AdmissionError {
    /// Both seats of the session are taken.
    #[display("Session is full")]
    SessionFull,
    /// No live session carries the requested identifier.
    #[display("Session not found")]
    SessionNotFound,
}

/// Internal fault raised while handling an action, with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Session error: {} at {}:{}", message, file, line)]
pub struct SessionError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SessionError {
    /// Creates a new session error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl<T> From<PoisonError<T>> for SessionError {
    #[track_caller]
    fn from(err: PoisonError<T>) -> Self {
        Self::new(format!("Lock poisoned: {}", err))
    }
}
