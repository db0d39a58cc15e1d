//! Game rules for tic-tac-toe.
//!
//! Pure functions over a board, free of state and I/O.

pub mod draw;
pub mod win;

pub use draw::{is_draw, is_full};
pub use win::{LINES, check_winner};
