//! TTT Core - Shared types for networked tic-tac-toe
//!
//! This crate provides the game domain types shared between
//! the server (tttd) and the protocol crate.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or unchecked indexing.

pub mod error;
pub mod game;
pub mod grid;
pub mod mark;

// Re-exports for convenience
pub use error::MoveError;
pub use game::{GameResult, GameState, MoveApplied};
pub use grid::{Cell, Grid, GRID_SIZE};
pub use mark::{Mark, Seat};
