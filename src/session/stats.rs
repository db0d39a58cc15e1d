//! Per-connection win/loss/tie tallies.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// How a concluded round went for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundResult {
    /// Participant's mark completed a line.
    Win,
    /// Opponent's mark completed a line.
    Loss,
    /// Board filled without a line.
    Tie,
}

/// Running record of a connection's rounds, kept across sessions it joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Getters, Serialize, Deserialize)]
pub struct PlayerStats {
    wins: u32,
    losses: u32,
    ties: u32,
}

impl PlayerStats {
    /// Adds one round result.
    pub fn record(&mut self, result: RoundResult) {
        match result {
            RoundResult::Win => self.wins += 1,
            RoundResult::Loss => self.losses += 1,
            RoundResult::Tie => self.ties += 1,
        }
    }

    /// Total rounds recorded.
    pub fn rounds(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}
