//! Move rejection reasons.
//!
//! The display strings double as the text replied to the offending player,
//! so they are written for humans rather than logs.

use thiserror::Error;

/// Reasons a move can be rejected.
///
/// Every variant is recoverable: the game state is left untouched and
/// the sender may try again.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// The sender does not hold the active seat.
    #[error("It's not your turn.")]
    OutOfTurn,

    /// The target cell already carries a mark.
    #[error("That cell is already taken. Please choose another.")]
    CellOccupied,

    /// Row or column outside 0..=2.
    #[error("Invalid input. Please enter valid row and column numbers.")]
    OutOfBounds,

    /// The line was not two coordinates.
    #[error("Invalid input. Please enter row and column numbers separated by space.")]
    MalformedInput,

    /// The game already reached a terminal state.
    #[error("The game is over.")]
    GameOver,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_player_facing() {
        assert_eq!(MoveError::OutOfTurn.to_string(), "It's not your turn.");
        assert!(MoveError::CellOccupied.to_string().contains("already taken"));
        assert!(MoveError::MalformedInput
            .to_string()
            .contains("separated by space"));
    }
}
