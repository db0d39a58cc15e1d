//! In-memory registry of live sessions and connection bindings.
//!
//! Each session sits behind its own mutex so transitions on one session
//! are serialized while different sessions proceed in parallel. The
//! registry's map locks are only held for lookups and inserts; no map lock
//! is ever held while a session lock is being acquired.

use super::error::SessionError;
use super::id::{ConnectionId, RandomSessionIds, SessionId, SessionIdGenerator};
use super::model::{Seat, Session, SessionSummary};
use super::stats::{PlayerStats, RoundResult};
use crate::games::tictactoe::Mark;
use derive_getters::Getters;
use derive_new::new;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Attempts at drawing an unused session identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Shared handle to one session.
pub type SharedSession = Arc<Mutex<Session>>;

/// Where a connection is seated.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Binding {
    session_id: SessionId,
    seat: Seat,
    mark: Mark,
    display_name: String,
}

/// Owns every live session plus the connection-to-participant index.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SharedSession>>,
    bindings: Mutex<HashMap<ConnectionId, Binding>>,
    stats: Mutex<HashMap<ConnectionId, PlayerStats>>,
    ids: Box<dyn SessionIdGenerator>,
}

impl SessionRegistry {
    /// Creates a registry drawing random base-36 session identifiers.
    #[instrument]
    pub fn new() -> Self {
        Self::with_id_generator(RandomSessionIds)
    }

    /// Creates a registry with a custom identifier source.
    #[instrument(skip(ids))]
    pub fn with_id_generator(ids: impl SessionIdGenerator + 'static) -> Self {
        info!("Creating session registry");
        Self {
            sessions: Mutex::new(HashMap::new()),
            bindings: Mutex::new(HashMap::new()),
            stats: Mutex::new(HashMap::new()),
            ids: Box::new(ids),
        }
    }

    /// Creates and stores an empty session under a fresh identifier.
    #[instrument(skip(self))]
    pub fn create_session(&self) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.lock()?;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            if sessions.contains_key(&id) {
                warn!(session_id = %id, attempt, "Session id collision, redrawing");
                continue;
            }
            let session = Arc::new(Mutex::new(Session::new(id.clone())));
            sessions.insert(id.clone(), Arc::clone(&session));
            info!(session_id = %id, live = sessions.len(), "Created new session");
            return Ok(session);
        }

        Err(SessionError::new(format!(
            "No unused session id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    /// Gets a session by ID.
    #[instrument(skip(self))]
    pub fn get(&self, id: &SessionId) -> Result<Option<SharedSession>, SessionError> {
        let session = self.sessions.lock()?.get(id).cloned();
        if session.is_none() {
            debug!(session_id = %id, "Session not found");
        }
        Ok(session)
    }

    /// Removes a session, returning it if it was live.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &SessionId) -> Result<Option<SharedSession>, SessionError> {
        let removed = self.sessions.lock()?.remove(id);
        if removed.is_some() {
            info!(session_id = %id, "Session deleted");
        }
        Ok(removed)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.lock()?.len())
    }

    /// Lists every live session for the lobby, sorted by identifier.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let handles: Vec<SharedSession> = self.sessions.lock()?.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.lock()?;
            if !session.is_closed() {
                summaries.push(session.summary());
            }
        }
        summaries.sort_by(|a, b| a.id().cmp(b.id()));
        debug!(count = summaries.len(), "Listed sessions");
        Ok(summaries)
    }

    /// Records where a connection is seated, returning any previous binding.
    #[instrument(skip(self, binding), fields(session_id = %binding.session_id))]
    pub fn bind_connection(
        &self,
        connection: ConnectionId,
        binding: Binding,
    ) -> Result<Option<Binding>, SessionError> {
        Ok(self.bindings.lock()?.insert(connection, binding))
    }

    /// Drops a connection's binding, returning it if present.
    #[instrument(skip(self))]
    pub fn unbind_connection(&self, connection: ConnectionId) -> Result<Option<Binding>, SessionError> {
        Ok(self.bindings.lock()?.remove(&connection))
    }

    /// Looks up a connection's binding.
    pub fn binding(&self, connection: ConnectionId) -> Result<Option<Binding>, SessionError> {
        Ok(self.bindings.lock()?.get(&connection).cloned())
    }

    /// Starts a record for a connection unless it already has one.
    pub fn ensure_stats(&self, connection: ConnectionId) -> Result<(), SessionError> {
        self.stats.lock()?.entry(connection).or_default();
        Ok(())
    }

    /// Adds a round result to a connection's record, if it has one.
    #[instrument(skip(self))]
    pub fn record_result(
        &self,
        connection: ConnectionId,
        result: RoundResult,
    ) -> Result<(), SessionError> {
        if let Some(stats) = self.stats.lock()?.get_mut(&connection) {
            stats.record(result);
        }
        Ok(())
    }

    /// Returns a connection's record.
    pub fn stats(&self, connection: ConnectionId) -> Result<Option<PlayerStats>, SessionError> {
        Ok(self.stats.lock()?.get(&connection).copied())
    }

    /// Drops a connection's record.
    pub fn forget_stats(&self, connection: ConnectionId) -> Result<(), SessionError> {
        self.stats.lock()?.remove(&connection);
        Ok(())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::id::SequentialSessionIds;

    /// Always proposes the same identifier.
    #[derive(Debug)]
    struct FixedIds;

    impl SessionIdGenerator for FixedIds {
        fn generate(&self) -> SessionId {
            SessionId::from("same")
        }
    }

    #[test]
    fn test_create_get_delete() {
        let registry = SessionRegistry::with_id_generator(SequentialSessionIds::new("s"));
        let session = registry.create_session().unwrap();
        let id = session.lock().unwrap().id().clone();
        assert_eq!(id, SessionId::from("s-1"));

        assert!(registry.get(&id).unwrap().is_some());
        assert!(registry.delete(&id).unwrap().is_some());
        assert!(registry.get(&id).unwrap().is_none());
        assert!(registry.delete(&id).unwrap().is_none());
    }

    #[test]
    fn test_new_session_defaults() {
        let registry = SessionRegistry::new();
        let session = registry.create_session().unwrap();
        let session = session.lock().unwrap();
        assert_eq!(session.participant_count(), 0);
        assert_eq!(*session.turn(), Seat::First);
        assert_eq!(*session.next_starter(), Seat::First);
        assert_eq!(session.scores().get(Mark::X), 0);
        assert_eq!(session.scores().get(Mark::O), 0);
        assert!(!session.round_over());
    }

    #[test]
    fn test_id_collision_exhausts_attempts() {
        let registry = SessionRegistry::with_id_generator(FixedIds);
        assert!(registry.create_session().is_ok());
        assert!(registry.create_session().is_err());
        assert_eq!(registry.session_count().unwrap(), 1);
    }

    #[test]
    fn test_bind_and_unbind() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new(7);
        let binding = Binding::new(SessionId::from("abc"), Seat::Second, Mark::O, "Bob".into());

        assert!(registry.bind_connection(conn, binding.clone()).unwrap().is_none());
        assert_eq!(registry.binding(conn).unwrap(), Some(binding.clone()));
        assert_eq!(registry.unbind_connection(conn).unwrap(), Some(binding));
        assert!(registry.unbind_connection(conn).unwrap().is_none());
    }

    #[test]
    fn test_stats_only_recorded_once_started() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new(1);
        registry.record_result(conn, RoundResult::Win).unwrap();
        assert!(registry.stats(conn).unwrap().is_none());

        registry.ensure_stats(conn).unwrap();
        registry.record_result(conn, RoundResult::Win).unwrap();
        registry.record_result(conn, RoundResult::Tie).unwrap();
        registry.ensure_stats(conn).unwrap();
        let stats = registry.stats(conn).unwrap().unwrap();
        assert_eq!(*stats.wins(), 1);
        assert_eq!(*stats.ties(), 1);
        assert_eq!(stats.rounds(), 2);

        registry.forget_stats(conn).unwrap();
        assert!(registry.stats(conn).unwrap().is_none());
    }
}
