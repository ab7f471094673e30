//! Messages sent from the server to players.

use std::fmt;

use ttt_core::{Grid, Mark, MoveError};

/// Every frame the server writes. `Display` yields the frame body; the
/// writer appends the terminating newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Sent to a player right after they take a seat.
    Welcome { mark: Mark },
    /// Broadcast once both seats are filled.
    GameStarted,
    /// Rendered board. Its own trailing newline plus the frame terminator
    /// leave a blank line after the board.
    Board(Grid),
    /// Broadcast at the start of each turn.
    Turn { mark: Mark },
    /// Sent to the active player only.
    Prompt,
    /// Reply to a rejected line, sent to its sender only.
    Rejected(MoveError),
    /// Broadcast when a mark completes a line.
    Winner { mark: Mark },
    /// Broadcast when the board fills with no line.
    Draw,
    /// Sent to the remaining player when the opponent leaves mid-game.
    Aborted,
    /// Sent to a connection that arrives after both seats are taken.
    GameFull,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome { mark } => write!(
                f,
                "Welcome! You are player {mark}. Waiting for an opponent..."
            ),
            ServerMessage::GameStarted => f.write_str("Game started!"),
            ServerMessage::Board(grid) => write!(f, "{grid}"),
            ServerMessage::Turn { mark } => write!(f, "Player {mark}'s turn"),
            ServerMessage::Prompt => {
                f.write_str("Your turn. Enter row and column (e.g., 1 2): ")
            }
            ServerMessage::Rejected(err) => write!(f, "{err}"),
            ServerMessage::Winner { mark } => write!(f, "Player {mark} wins!"),
            ServerMessage::Draw => f.write_str("It's a draw!"),
            ServerMessage::Aborted => f.write_str("Your opponent disconnected. Game aborted."),
            ServerMessage::GameFull => f.write_str("Game is full."),
        }
    }
}

impl ServerMessage {
    /// Encodes the message as a complete newline-terminated frame.
    pub fn to_frame(&self) -> String {
        format!("{self}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines() {
        assert_eq!(ServerMessage::GameStarted.to_frame(), "Game started!\n");
        assert_eq!(
            ServerMessage::Turn { mark: Mark::O }.to_frame(),
            "Player O's turn\n"
        );
        assert_eq!(
            ServerMessage::Winner { mark: Mark::X }.to_string(),
            "Player X wins!"
        );
        assert_eq!(ServerMessage::Draw.to_string(), "It's a draw!");
    }

    #[test]
    fn test_board_frame_ends_with_blank_line() {
        let frame = ServerMessage::Board(Grid::new()).to_frame();
        assert!(frame.starts_with("   0   1   2\n"));
        assert!(frame.ends_with(" \n\n"));
    }

    #[test]
    fn test_rejection_uses_move_error_text() {
        assert_eq!(
            ServerMessage::Rejected(MoveError::OutOfTurn).to_string(),
            "It's not your turn."
        );
    }
}
