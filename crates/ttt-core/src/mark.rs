//! Player identity: marks and seats.

use std::fmt;

/// The symbol a seat plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    /// Plays first.
    X,
    /// Plays second.
    O,
}

impl Mark {
    /// Returns the other mark.
    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// The mark played by a seat. Seat 0 plays X.
    #[must_use]
    pub fn for_seat(seat: Seat) -> Self {
        if seat == Seat::FIRST {
            Mark::X
        } else {
            Mark::O
        }
    }

    /// Single-character rendering used on the board.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A player's fixed slot for the session, assigned in join order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seat(u8);

impl Seat {
    /// The first player to join.
    pub const FIRST: Seat = Seat(0);
    /// The second player to join.
    pub const SECOND: Seat = Seat(1);
    /// Both seats in join order.
    pub const ALL: [Seat; 2] = [Seat::FIRST, Seat::SECOND];

    /// Returns the opposing seat.
    #[must_use]
    pub fn other(self) -> Self {
        if self == Seat::FIRST {
            Seat::SECOND
        } else {
            Seat::FIRST
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
