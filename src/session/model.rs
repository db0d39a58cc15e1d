//! Session state: seats, board, turn, scores and round status.

use super::error::AdmissionError;
use super::id::{ConnectionId, SessionId};
use super::outcome::IgnoreReason;
use crate::games::tictactoe::{Board, CELL_COUNT, GameStatus, Mark, check_winner, is_draw};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument};

/// Maximum participants per session.
pub const MAX_PARTICIPANTS: usize = 2;

/// Seat of a participant within a session.
///
/// The seat fixes both the participant's mark and its turn slot.
/// On the wire a seat is its index, `0` or `1`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Seat {
    /// Index 0, plays `X`.
    #[default]
    #[display("0")]
    First,
    /// Index 1, plays `O`.
    #[display("1")]
    Second,
}

impl Seat {
    /// Returns the seat index (0 or 1).
    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    /// Returns the mark played from this seat.
    pub fn mark(self) -> Mark {
        match self {
            Seat::First => Mark::X,
            Seat::Second => Mark::O,
        }
    }

    /// Returns the other seat.
    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    /// Name given to a participant who joins without one.
    pub fn default_name(self) -> String {
        format!("Player {}", self.index() + 1)
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        match seat {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Seat::First),
            1 => Ok(Seat::Second),
            other => Err(format!("Invalid seat index: {}", other)),
        }
    }
}

/// A connected player seated in a session.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Participant {
    /// Owning connection.
    connection_id: ConnectionId,
    /// Seat, fixed for the participant's lifetime.
    seat: Seat,
    /// Name shown to both players.
    display_name: String,
}

impl Participant {
    /// Returns the participant's mark.
    pub fn mark(&self) -> Mark {
        self.seat.mark()
    }

    /// Returns the public roster view of this participant.
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry::new(self.display_name.clone(), self.mark())
    }
}

/// Public view of a seated participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    display_name: String,
    symbol: Mark,
}

/// Rounds won per mark over the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scores {
    #[serde(rename = "X")]
    x: u32,
    #[serde(rename = "O")]
    o: u32,
}

impl Scores {
    /// Returns the win count for a mark.
    pub fn get(&self, mark: Mark) -> u32 {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
        }
    }

    fn record_win(&mut self, mark: Mark) {
        match mark {
            Mark::X => self.x += 1,
            Mark::O => self.o += 1,
        }
    }
}

/// Coarse lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// Fewer than two participants.
    Waiting,
    /// Two participants, round in progress.
    Active,
    /// Two participants, round concluded and awaiting reset.
    RoundOver,
}

/// Lobby listing entry for one live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    id: SessionId,
    participant_count: usize,
    round_over: bool,
}

/// One matchup between at most two participants, persisting across rounds.
#[derive(Debug, Clone, Getters)]
pub struct Session {
    /// Session ID.
    id: SessionId,
    /// Board of the current round.
    board: Board,
    /// Seat slots, indexed by [`Seat::index`].
    seats: [Option<Participant>; MAX_PARTICIPANTS],
    /// Seat allowed to move next.
    turn: Seat,
    /// Status of the current round.
    status: GameStatus,
    /// Wins per mark.
    scores: Scores,
    /// Seat that opens the next round.
    next_starter: Seat,
    #[getter(skip)]
    closed: bool,
}

impl Session {
    /// Creates an empty session waiting for participants.
    #[instrument]
    pub fn new(id: SessionId) -> Self {
        info!(session_id = %id, "Creating new session");
        Self {
            id,
            board: Board::new(),
            seats: [None, None],
            turn: Seat::First,
            status: GameStatus::InProgress,
            scores: Scores::default(),
            next_starter: Seat::First,
            closed: false,
        }
    }

    /// Returns seated participants in seat order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.seats.iter().flatten()
    }

    /// Returns the participant in a seat, if any.
    pub fn participant(&self, seat: Seat) -> Option<&Participant> {
        self.seats[seat.index()].as_ref()
    }

    /// Number of seated participants.
    pub fn participant_count(&self) -> usize {
        self.participants().count()
    }

    /// Returns the seat held by a connection.
    pub fn seat_of(&self, connection: ConnectionId) -> Option<Seat> {
        self.participants()
            .find(|p| p.connection_id == connection)
            .map(|p| p.seat)
    }

    /// True while a seat is vacant.
    pub fn has_free_seat(&self) -> bool {
        self.seats.iter().any(Option::is_none)
    }

    /// True once the current round has concluded.
    pub fn round_over(&self) -> bool {
        self.status.is_over()
    }

    /// Derives the lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if self.participant_count() < MAX_PARTICIPANTS {
            SessionPhase::Waiting
        } else if self.round_over() {
            SessionPhase::RoundOver
        } else {
            SessionPhase::Active
        }
    }

    /// Public roster in seat order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.participants().map(Participant::roster_entry).collect()
    }

    /// Lobby listing entry.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary::new(self.id.clone(), self.participant_count(), self.round_over())
    }

    /// True once the session has been removed from its registry.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    /// Seats a new participant in the lowest free seat.
    ///
    /// An empty or blank display name is replaced by the seat's default.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn seat_participant(
        &mut self,
        connection: ConnectionId,
        display_name: &str,
    ) -> Result<Participant, AdmissionError> {
        let seat = Seat::iter()
            .find(|seat| self.seats[seat.index()].is_none())
            .ok_or(AdmissionError::SessionFull)?;

        let name = match display_name.trim() {
            "" => seat.default_name(),
            name => name.to_string(),
        };
        let participant = Participant::new(connection, seat, name);
        self.seats[seat.index()] = Some(participant.clone());
        debug!(%connection, %seat, mark = %seat.mark(), "Participant seated");
        Ok(participant)
    }

    /// Removes the participant owned by a connection, vacating its seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn remove_participant(&mut self, connection: ConnectionId) -> Option<Participant> {
        let seat = self.seat_of(connection)?;
        self.seats[seat.index()].take()
    }

    /// Applies a move for the participant in `seat`.
    ///
    /// On success returns the round status after the move. A concluded
    /// round bumps the winner's score and hands the next round to the
    /// other starter.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn apply_move(&mut self, seat: Seat, cell: usize) -> Result<GameStatus, IgnoreReason> {
        if self.phase() != SessionPhase::Active {
            return Err(IgnoreReason::NotActive);
        }
        if self.turn != seat {
            return Err(IgnoreReason::NotYourTurn);
        }
        if cell >= CELL_COUNT {
            return Err(IgnoreReason::CellOutOfRange);
        }
        if !self.board.is_empty(cell) {
            return Err(IgnoreReason::CellOccupied);
        }

        self.board
            .place(cell, seat.mark())
            .map_err(|_| IgnoreReason::CellOutOfRange)?;
        self.turn = seat.other();

        if let Some(winner) = check_winner(&self.board) {
            self.status = GameStatus::Won(winner);
            self.scores.record_win(winner);
            self.next_starter = self.next_starter.other();
        } else if is_draw(&self.board) {
            self.status = GameStatus::Draw;
            self.next_starter = self.next_starter.other();
        }

        debug!(%seat, cell, status = ?self.status, "Move applied");
        Ok(self.status)
    }

    /// Clears the board for a new round opened by `next_starter`.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn reset_round(&mut self) -> Result<(), IgnoreReason> {
        if self.participant_count() < MAX_PARTICIPANTS {
            return Err(IgnoreReason::NotEnoughParticipants);
        }
        self.board = Board::new();
        self.turn = self.next_starter;
        self.status = GameStatus::InProgress;
        debug!(turn = %self.turn, "Round reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_session() -> Session {
        let mut session = Session::new(SessionId::from("test"));
        session.seat_participant(ConnectionId::new(1), "Alice").unwrap();
        session.seat_participant(ConnectionId::new(2), "Bob").unwrap();
        session
    }

    #[test]
    fn test_seat_serializes_as_index() {
        assert_eq!(serde_json::to_string(&Seat::Second).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Seat>("0").unwrap(), Seat::First);
        assert!(serde_json::from_str::<Seat>("2").is_err());
    }

    #[test]
    fn test_blank_name_gets_default() {
        let mut session = Session::new(SessionId::from("test"));
        let first = session.seat_participant(ConnectionId::new(1), "  ").unwrap();
        let second = session.seat_participant(ConnectionId::new(2), "").unwrap();
        assert_eq!(first.display_name(), "Player 1");
        assert_eq!(second.display_name(), "Player 2");
    }

    #[test]
    fn test_free_seat_tracks_departures() {
        let mut session = full_session();
        assert!(!session.has_free_seat());
        session.remove_participant(ConnectionId::new(1));
        assert!(session.has_free_seat());
        let carol = session.seat_participant(ConnectionId::new(3), "Carol").unwrap();
        assert_eq!(*carol.seat(), Seat::First);
    }

    #[test]
    fn test_third_participant_rejected() {
        let mut session = full_session();
        let result = session.seat_participant(ConnectionId::new(3), "Carol");
        assert_eq!(result, Err(AdmissionError::SessionFull));
        assert_eq!(session.participant_count(), 2);
    }

    #[test]
    fn test_move_requires_two_participants() {
        let mut session = Session::new(SessionId::from("test"));
        session.seat_participant(ConnectionId::new(1), "Alice").unwrap();
        assert_eq!(session.apply_move(Seat::First, 0), Err(IgnoreReason::NotActive));
        assert_eq!(session.board(), &Board::new());
    }

    #[test]
    fn test_move_flips_turn() {
        let mut session = full_session();
        assert_eq!(session.apply_move(Seat::First, 4), Ok(GameStatus::InProgress));
        assert_eq!(*session.turn(), Seat::Second);
        assert_eq!(session.apply_move(Seat::First, 0), Err(IgnoreReason::NotYourTurn));
        assert_eq!(session.apply_move(Seat::Second, 4), Err(IgnoreReason::CellOccupied));
        assert_eq!(session.apply_move(Seat::Second, 9), Err(IgnoreReason::CellOutOfRange));
    }

    #[test]
    fn test_filled_board_without_line_is_draw() {
        let mut session = full_session();
        // X O X / X O O / O X X
        for (seat, cell) in [
            (Seat::First, 0),
            (Seat::Second, 1),
            (Seat::First, 2),
            (Seat::Second, 4),
            (Seat::First, 3),
            (Seat::Second, 5),
            (Seat::First, 7),
            (Seat::Second, 6),
        ] {
            assert_eq!(session.apply_move(seat, cell), Ok(GameStatus::InProgress));
        }
        assert_eq!(session.apply_move(Seat::First, 8), Ok(GameStatus::Draw));
        assert_eq!(*session.scores(), Scores::default());
        assert_eq!(*session.next_starter(), Seat::Second);
    }

    #[test]
    fn test_reset_keeps_scores_and_uses_next_starter() {
        let mut session = full_session();
        for (seat, cell) in [
            (Seat::First, 0),
            (Seat::Second, 4),
            (Seat::First, 1),
            (Seat::Second, 3),
            (Seat::First, 2),
        ] {
            session.apply_move(seat, cell).unwrap();
        }
        assert_eq!(session.phase(), SessionPhase::RoundOver);
        assert_eq!(*session.next_starter(), Seat::Second);

        session.reset_round().unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(*session.turn(), Seat::Second);
        assert_eq!(session.scores().get(Mark::X), 1);
        assert_eq!(*session.next_starter(), Seat::Second);
        assert_eq!(session.board(), &Board::new());
    }
}
