//! Session and connection identifiers.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Length of generated session identifiers.
pub const SESSION_ID_LEN: usize = 6;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque identifier of a session, stable for the session's lifetime.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a live transport connection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
#[display("conn-{}", _0)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw connection number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw connection number.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Source of fresh session identifiers.
///
/// Generators need not guarantee uniqueness on their own; the registry
/// redraws when a candidate collides with a live session.
pub trait SessionIdGenerator: Send + Sync + Debug {
    /// Produces a candidate identifier.
    fn generate(&self) -> SessionId;
}

/// Draws lowercase base-36 identifiers of [`SESSION_ID_LEN`] characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSessionIds;

impl SessionIdGenerator for RandomSessionIds {
    fn generate(&self) -> SessionId {
        let mut rng = rand::thread_rng();
        let id: String = (0..SESSION_ID_LEN)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect();
        SessionId::new(id)
    }
}

/// Deterministic `prefix-N` identifiers, counting from 1.
#[derive(Debug)]
pub struct SequentialSessionIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialSessionIds {
    /// Creates a generator yielding `prefix-1`, `prefix-2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl SessionIdGenerator for SequentialSessionIds {
    fn generate(&self) -> SessionId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        SessionId::new(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_base36() {
        let ids = RandomSessionIds;
        for _ in 0..100 {
            let id = ids.generate();
            assert_eq!(id.as_str().len(), SESSION_ID_LEN);
            assert!(id.as_str().bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialSessionIds::new("room");
        assert_eq!(ids.generate(), SessionId::from("room-1"));
        assert_eq!(ids.generate(), SessionId::from("room-2"));
    }
}
