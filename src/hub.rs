//! Messaging substrate: per-connection outboxes grouped by session.
//!
//! The coordinator only needs the four primitives of [`EventSink`]. The
//! [`Hub`] realizes them with one unbounded channel per connection, so a
//! send never blocks the caller and each receiver sees events in the order
//! they were handed over.

use crate::protocol::ServerEvent;
use crate::session::{ConnectionId, SessionId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, instrument};

/// Delivery primitives offered by the transport.
pub trait EventSink: Send + Sync + Debug {
    /// Adds a connection to a session's group.
    fn join_group(&self, group: &SessionId, connection: ConnectionId);

    /// Removes a connection from a session's group.
    fn leave_group(&self, group: &SessionId, connection: ConnectionId);

    /// Delivers an event to one connection.
    fn send_to(&self, connection: ConnectionId, event: &ServerEvent);

    /// Delivers an event to every member of a session's group.
    fn send_to_group(&self, group: &SessionId, event: &ServerEvent);
}

/// In-process [`EventSink`] backed by tokio channels.
#[derive(Debug)]
pub struct Hub {
    outboxes: Mutex<HashMap<ConnectionId, UnboundedSender<ServerEvent>>>,
    groups: Mutex<HashMap<SessionId, Vec<ConnectionId>>>,
    next_id: AtomicU64,
}

// Hub maps hold no cross-entry invariants, so a poisoned guard is still usable.
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Hub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            outboxes: Mutex::new(HashMap::new()),
            groups: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new connection and returns its id and event stream.
    #[instrument(skip(self))]
    pub fn connect(&self) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let connection = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = unbounded_channel();
        relock(&self.outboxes).insert(connection, tx);
        debug!(%connection, "Connection registered");
        (connection, rx)
    }

    /// Forgets a connection: its outbox closes and it leaves every group.
    #[instrument(skip(self))]
    pub fn disconnect(&self, connection: ConnectionId) {
        relock(&self.outboxes).remove(&connection);
        relock(&self.groups).retain(|_, members| {
            members.retain(|member| *member != connection);
            !members.is_empty()
        });
        debug!(%connection, "Connection unregistered");
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        relock(&self.outboxes).len()
    }

    /// Members of a session's group.
    pub fn group_members(&self, group: &SessionId) -> Vec<ConnectionId> {
        relock(&self.groups).get(group).cloned().unwrap_or_default()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Hub {
    fn join_group(&self, group: &SessionId, connection: ConnectionId) {
        let mut groups = relock(&self.groups);
        let members = groups.entry(group.clone()).or_default();
        if !members.contains(&connection) {
            members.push(connection);
        }
    }

    fn leave_group(&self, group: &SessionId, connection: ConnectionId) {
        let mut groups = relock(&self.groups);
        if let Some(members) = groups.get_mut(group) {
            members.retain(|member| *member != connection);
            if members.is_empty() {
                groups.remove(group);
            }
        }
    }

    fn send_to(&self, connection: ConnectionId, event: &ServerEvent) {
        if let Some(tx) = relock(&self.outboxes).get(&connection)
            && tx.send(event.clone()).is_err()
        {
            debug!(%connection, "Outbox closed, event dropped");
        }
    }

    fn send_to_group(&self, group: &SessionId, event: &ServerEvent) {
        let members = self.group_members(group);
        let outboxes = relock(&self.outboxes);
        for connection in members {
            if let Some(tx) = outboxes.get(&connection)
                && tx.send(event.clone()).is_err()
            {
                debug!(%connection, session_id = %group, "Outbox closed, event dropped");
            }
        }
    }
}
