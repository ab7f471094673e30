//! Parsing of inbound player lines.

use ttt_core::MoveError;

/// Keyword a player sends to leave the game.
pub const QUIT: &str = "quit";

/// A command decoded from one player line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Place the player's mark at (row, col).
    Move { row: usize, col: usize },
    /// Leave the game.
    Quit,
}

/// Errors from decoding a player line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected two coordinates, got {0:?}")]
    Malformed(String),

    #[error("coordinate out of range: {0:?}")]
    OutOfRange(String),
}

impl From<ParseError> for MoveError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Malformed(_) => MoveError::MalformedInput,
            ParseError::OutOfRange(_) => MoveError::OutOfBounds,
        }
    }
}

/// Decodes one line (without its terminator).
///
/// Surrounding whitespace is ignored. Coordinates must each be a single
/// digit 0-2; anything else that still has exactly two tokens is reported
/// as out of range.
pub fn parse_command(line: &str) -> Result<ClientCommand, ParseError> {
    let line = line.trim();
    if line == QUIT {
        return Ok(ClientCommand::Quit);
    }

    let mut tokens = line.split_whitespace();
    let (Some(row), Some(col), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ParseError::Malformed(line.to_string()));
    };

    Ok(ClientCommand::Move {
        row: parse_coordinate(row)?,
        col: parse_coordinate(col)?,
    })
}

fn parse_coordinate(token: &str) -> Result<usize, ParseError> {
    match token {
        "0" => Ok(0),
        "1" => Ok(1),
        "2" => Ok(2),
        other => Err(ParseError::OutOfRange(other.to_string())),
    }
}
