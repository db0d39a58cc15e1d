//! Tic-tac-toe board engine.

mod types;

pub mod rules;

pub use rules::{LINES, check_winner, is_draw, is_full};
pub use types::{Board, CELL_COUNT, GameStatus, Mark, Square};
