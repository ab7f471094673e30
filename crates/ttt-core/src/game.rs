//! Game state and move application.

use tracing::debug;

use crate::{Grid, Mark, MoveError, Seat, GRID_SIZE};

/// Outcome of the game so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    /// Moves are still expected.
    Pending,
    /// The mark completed a line.
    Win(Mark),
    /// The board filled up with no line.
    Draw,
}

impl GameResult {
    /// True for `Win` and `Draw`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != GameResult::Pending
    }
}

/// Summary of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveApplied {
    pub seat: Seat,
    pub mark: Mark,
    pub row: usize,
    pub col: usize,
    /// Result after the move.
    pub result: GameResult,
}

/// Board, turn tracker and result for one session.
///
/// Starts with an empty grid, X to move from seat 0. Once the result
/// leaves `Pending` every further move is rejected with `GameOver`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    grid: Grid,
    active_mark: Mark,
    active_seat: Seat,
    result: GameResult,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            grid: Grid::new(),
            active_mark: Mark::X,
            active_seat: Seat::FIRST,
            result: GameResult::Pending,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active_mark(&self) -> Mark {
        self.active_mark
    }

    pub fn active_seat(&self) -> Seat {
        self.active_seat
    }

    /// Number of marked cells.
    pub fn filled(&self) -> usize {
        self.grid.filled()
    }

    /// Returns the current result. Win is decided against the mark that
    /// moved last and takes priority over a full board.
    pub fn check_terminal(&self) -> GameResult {
        self.result
    }

    /// Applies a move for `seat` at (row, col).
    ///
    /// # Errors
    ///
    /// - `MoveError::GameOver` once the result is no longer pending
    /// - `MoveError::OutOfTurn` if `seat` is not the active seat
    /// - `MoveError::OutOfBounds` if row or col is outside 0..=2
    /// - `MoveError::CellOccupied` if the cell already carries a mark
    ///
    /// A rejected move leaves the state untouched.
    pub fn apply_move(
        &mut self,
        seat: Seat,
        row: usize,
        col: usize,
    ) -> Result<MoveApplied, MoveError> {
        if self.result.is_terminal() {
            return Err(MoveError::GameOver);
        }
        if seat != self.active_seat {
            return Err(MoveError::OutOfTurn);
        }
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return Err(MoveError::OutOfBounds);
        }

        let mark = self.active_mark;
        if !self.grid.place(row, col, mark) {
            return Err(MoveError::CellOccupied);
        }
        self.result = self.evaluate(mark);

        debug!(
            seat = %seat,
            mark = %mark,
            row,
            col,
            filled = self.filled(),
            result = ?self.result,
            "Move applied"
        );

        if !self.result.is_terminal() {
            self.active_mark = mark.opponent();
            self.active_seat = seat.other();
        }

        Ok(MoveApplied {
            seat,
            mark,
            row,
            col,
            result: self.result,
        })
    }

    fn evaluate(&self, last_mover: Mark) -> GameResult {
        if self.grid.has_line(last_mover) {
            GameResult::Win(last_mover)
        } else if self.filled() == GRID_SIZE * GRID_SIZE {
            GameResult::Draw
        } else {
            GameResult::Pending
        }
    }
}
