//! Session coordinator: join, move, reset and leave transitions.
//!
//! Each transition locks its session for its whole duration, and every
//! event it emits is handed to the [`EventSink`] before that lock is
//! released. Members of a session therefore receive events in exactly the
//! order transitions were applied, and never for a state that has not yet
//! been committed.

use super::error::{AdmissionError, SessionError};
use super::id::{ConnectionId, SessionId};
use super::model::{MAX_PARTICIPANTS, Session};
use super::outcome::{ActionOutcome, IgnoreReason};
use super::registry::{Binding, SessionRegistry};
use super::stats::RoundResult;
use crate::games::tictactoe::{GameStatus, Mark};
use crate::hub::EventSink;
use crate::protocol::{ClientAction, ServerEvent};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Applies inbound actions to sessions and emits the resulting events.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn EventSink>,
}

impl SessionCoordinator {
    /// Creates a coordinator over a registry, emitting through `sink`.
    #[instrument(skip_all)]
    pub fn new(registry: Arc<SessionRegistry>, sink: Arc<dyn EventSink>) -> Self {
        info!("Creating session coordinator");
        Self { registry, sink }
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Dispatches one inbound action from `connection`.
    #[instrument(skip(self, action), fields(%connection))]
    pub fn handle(
        &self,
        connection: ConnectionId,
        action: ClientAction,
    ) -> Result<ActionOutcome, SessionError> {
        match action {
            ClientAction::JoinSession {
                session_id,
                display_name,
            } => self.join(connection, session_id.as_deref(), &display_name),
            ClientAction::MakeMove {
                session_id,
                cell_index: Some(cell_index),
            } => self.make_move(connection, &session_id, cell_index),
            ClientAction::MakeMove { cell_index: None, .. } => {
                Ok(self.ignore(IgnoreReason::CellOutOfRange))
            }
            ClientAction::ResetSession { session_id } => self.reset(connection, &session_id),
            ClientAction::LeaveSession => self.leave(connection),
            ClientAction::GetStats => self.send_stats(connection),
        }
    }

    /// Seats `connection` in a session.
    ///
    /// A missing or blank `session_id` creates a new session. A connection
    /// that is already seated elsewhere moves only once the target has
    /// admitted it; a rejected join leaves its current seat untouched.
    #[instrument(skip(self), fields(%connection))]
    pub fn join(
        &self,
        connection: ConnectionId,
        session_id: Option<&str>,
        display_name: &str,
    ) -> Result<ActionOutcome, SessionError> {
        let current = self.registry.binding(connection)?;

        let requested = session_id.map(str::trim).filter(|id| !id.is_empty());
        let (target_id, target) = match requested {
            Some(id) => {
                let id = SessionId::from(id);
                if current.as_ref().is_some_and(|b| b.session_id() == &id) {
                    return Ok(self.ignore(IgnoreReason::AlreadySeated));
                }
                match self.registry.get(&id)? {
                    Some(shared) => (id, shared),
                    None => return Ok(self.reject(connection, AdmissionError::SessionNotFound)),
                }
            }
            None => {
                let shared = self.registry.create_session()?;
                let id = shared.lock()?.id().clone();
                (id, shared)
            }
        };

        let previous = match &current {
            Some(binding) => self
                .registry
                .get(binding.session_id())?
                .map(|shared| (binding.session_id().clone(), shared)),
            None => None,
        };

        // Two session locks are only ever taken together here, in id order.
        let (mut session, mut vacated) = match &previous {
            Some((previous_id, previous)) if *previous_id < target_id => {
                let vacated = previous.lock()?;
                (target.lock()?, Some(vacated))
            }
            Some((_, previous)) => {
                let session = target.lock()?;
                (session, Some(previous.lock()?))
            }
            None => (target.lock()?, None),
        };

        if session.is_closed() {
            return Ok(self.reject(connection, AdmissionError::SessionNotFound));
        }
        if !session.has_free_seat() {
            return Ok(self.reject(connection, AdmissionError::SessionFull));
        }

        if let Some(vacated) = vacated.as_mut() {
            debug!(from = %vacated.id(), to = %session.id(), "Moving to another session");
            self.vacate(connection, vacated)?;
        }

        let participant = match session.seat_participant(connection, display_name) {
            Ok(participant) => participant,
            Err(reason) => return Ok(self.reject(connection, reason)),
        };
        let seat = *participant.seat();

        self.registry.bind_connection(
            connection,
            Binding::new(
                session.id().clone(),
                seat,
                seat.mark(),
                participant.display_name().clone(),
            ),
        )?;
        self.registry.ensure_stats(connection)?;
        self.sink.join_group(session.id(), connection);

        info!(
            session_id = %session.id(),
            name = %participant.display_name(),
            %seat,
            mark = %participant.mark(),
            "Participant joined"
        );

        self.sink
            .send_to(connection, &ServerEvent::joined(&session, &participant));
        self.sink
            .send_to_group(session.id(), &ServerEvent::roster_updated(&session));

        if session.participant_count() == MAX_PARTICIPANTS {
            info!(
                session_id = %session.id(),
                roster = ?session.roster(),
                "Session full, round starting"
            );
            self.sink
                .send_to_group(session.id(), &ServerEvent::round_started(&session));
        }

        Ok(ActionOutcome::Applied)
    }

    /// Places the mark of `connection`'s participant on `cell_index`.
    #[instrument(skip(self), fields(%connection))]
    pub fn make_move(
        &self,
        connection: ConnectionId,
        session_id: &SessionId,
        cell_index: i64,
    ) -> Result<ActionOutcome, SessionError> {
        let Some(shared) = self.registry.get(session_id)? else {
            return Ok(self.ignore(IgnoreReason::UnknownSession));
        };
        let Some(binding) = self.registry.binding(connection)? else {
            return Ok(self.ignore(IgnoreReason::UnboundConnection));
        };
        if binding.session_id() != session_id {
            return Ok(self.ignore(IgnoreReason::ForeignSession));
        }

        let mut session = shared.lock()?;
        if session.is_closed() {
            return Ok(self.ignore(IgnoreReason::UnknownSession));
        }
        let Some(seat) = session.seat_of(connection) else {
            return Ok(self.ignore(IgnoreReason::UnboundConnection));
        };
        let Ok(cell) = usize::try_from(cell_index) else {
            return Ok(self.ignore(IgnoreReason::CellOutOfRange));
        };

        let status = match session.apply_move(seat, cell) {
            Ok(status) => status,
            Err(reason) => return Ok(self.ignore(reason)),
        };

        if status.is_over() {
            self.record_round(&session, status)?;
            info!(
                session_id = %session.id(),
                outcome = ?status,
                x = session.scores().get(Mark::X),
                o = session.scores().get(Mark::O),
                next_starter = %session.next_starter(),
                "Round concluded\n{}",
                session.board().display()
            );
        }

        self.sink
            .send_to_group(session.id(), &ServerEvent::move_applied(&session));
        Ok(ActionOutcome::Applied)
    }

    /// Clears the board and hands the turn to the designated starter.
    #[instrument(skip(self), fields(%connection))]
    pub fn reset(
        &self,
        connection: ConnectionId,
        session_id: &SessionId,
    ) -> Result<ActionOutcome, SessionError> {
        let Some(shared) = self.registry.get(session_id)? else {
            return Ok(self.ignore(IgnoreReason::UnknownSession));
        };

        let mut session = shared.lock()?;
        if session.is_closed() {
            return Ok(self.ignore(IgnoreReason::UnknownSession));
        }
        if session.seat_of(connection).is_none() {
            return Ok(self.ignore(IgnoreReason::ForeignSession));
        }
        if let Err(reason) = session.reset_round() {
            return Ok(self.ignore(reason));
        }

        info!(session_id = %session.id(), turn = %session.turn(), "Round reset");
        self.sink
            .send_to_group(session.id(), &ServerEvent::round_reset(&session));
        Ok(ActionOutcome::Applied)
    }

    /// Vacates `connection`'s seat; the session is destroyed once empty.
    #[instrument(skip(self), fields(%connection))]
    pub fn leave(&self, connection: ConnectionId) -> Result<ActionOutcome, SessionError> {
        let Some(binding) = self.registry.unbind_connection(connection)? else {
            return Ok(self.ignore(IgnoreReason::UnboundConnection));
        };
        let Some(shared) = self.registry.get(binding.session_id())? else {
            return Ok(self.ignore(IgnoreReason::UnknownSession));
        };

        let mut session = shared.lock()?;
        self.vacate(connection, &mut session)
    }

    /// Removes `connection` from a locked session and tells whoever remains.
    fn vacate(
        &self,
        connection: ConnectionId,
        session: &mut Session,
    ) -> Result<ActionOutcome, SessionError> {
        self.sink.leave_group(session.id(), connection);
        if session.remove_participant(connection).is_none() {
            return Ok(self.ignore(IgnoreReason::UnboundConnection));
        }

        if session.participant_count() == 0 {
            session.close();
            self.registry.delete(session.id())?;
            info!(session_id = %session.id(), "Session deleted, no participants left");
        } else {
            self.sink
                .send_to_group(session.id(), &ServerEvent::OpponentLeft);
            info!(
                session_id = %session.id(),
                remaining = session.participant_count(),
                "Participant left"
            );
        }

        Ok(ActionOutcome::Applied)
    }

    /// Handles connection loss: same effect as [`leave`](Self::leave),
    /// and the connection's record is discarded.
    #[instrument(skip(self), fields(%connection))]
    pub fn disconnect(&self, connection: ConnectionId) -> Result<ActionOutcome, SessionError> {
        let outcome = self.leave(connection)?;
        self.registry.forget_stats(connection)?;
        info!(%outcome, "Connection closed");
        Ok(outcome)
    }

    /// Sends `connection` its win/loss/tie record.
    #[instrument(skip(self), fields(%connection))]
    pub fn send_stats(&self, connection: ConnectionId) -> Result<ActionOutcome, SessionError> {
        let stats = self.registry.stats(connection)?.unwrap_or_default();
        self.sink.send_to(connection, &ServerEvent::stats(&stats));
        Ok(ActionOutcome::Applied)
    }

    fn record_round(&self, session: &Session, status: GameStatus) -> Result<(), SessionError> {
        for participant in session.participants() {
            let result = match status {
                GameStatus::Won(mark) if mark == participant.mark() => RoundResult::Win,
                GameStatus::Won(_) => RoundResult::Loss,
                GameStatus::Draw => RoundResult::Tie,
                GameStatus::InProgress => continue,
            };
            self.registry
                .record_result(*participant.connection_id(), result)?;
        }
        Ok(())
    }

    fn reject(&self, connection: ConnectionId, reason: AdmissionError) -> ActionOutcome {
        warn!(%connection, %reason, "Join rejected");
        self.sink.send_to(connection, &ServerEvent::from(reason));
        ActionOutcome::Rejected(reason)
    }

    fn ignore(&self, reason: IgnoreReason) -> ActionOutcome {
        debug!(%reason, "Action ignored");
        ActionOutcome::Ignored(reason)
    }
}
