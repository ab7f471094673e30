//! Connection registry - seat assignment for live players.
//!
//! The registry is plain data. It lives inside the coordinator's lock so
//! that seat changes and game-state changes are always observed together.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Lookups return `Option`, capacity violations return `RegistryError`

use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWrite, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, info};

use ttt_core::Seat;

/// Maximum number of seated players.
pub const MAX_PLAYERS: usize = 2;

/// Identifier the server assigns to every accepted connection.
pub type ConnectionId = u64;

/// Shared, buffered write half of a player connection.
pub type PlayerWriter = Arc<Mutex<BufWriter<Box<dyn AsyncWrite + Send + Unpin>>>>;

/// Wraps any async writer into a [`PlayerWriter`].
pub fn player_writer<W>(writer: W) -> PlayerWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let boxed: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
    Arc::new(Mutex::new(BufWriter::new(boxed)))
}

/// A seated player.
#[derive(Clone)]
pub struct PlayerEntry {
    pub id: ConnectionId,
    pub seat: Seat,
    pub writer: PlayerWriter,
}

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Game is full (max: {max} players)")]
    Full { max: usize },

    #[error("Connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    #[error("Game already in progress")]
    SessionStarted,
}

/// Live player connections, ordered by join time.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: Vec<PlayerEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats a connection in the lowest free seat.
    ///
    /// # Errors
    ///
    /// - `RegistryError::Full` when both seats are taken
    /// - `RegistryError::AlreadyRegistered` if `id` already holds a seat
    pub fn register(
        &mut self,
        id: ConnectionId,
        writer: PlayerWriter,
    ) -> Result<Seat, RegistryError> {
        if self.entries.iter().any(|e| e.id == id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        if self.entries.len() >= MAX_PLAYERS {
            debug!(connection = id, "Registry full, rejecting connection");
            return Err(RegistryError::Full { max: MAX_PLAYERS });
        }

        let seat = Seat::ALL
            .into_iter()
            .find(|seat| self.entries.iter().all(|e| e.seat != *seat))
            .ok_or(RegistryError::Full { max: MAX_PLAYERS })?;

        self.entries.push(PlayerEntry { id, seat, writer });
        info!(connection = id, seat = %seat, players = self.entries.len(), "Player seated");
        Ok(seat)
    }

    /// Removes a connection, returning the seat it held.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Seat> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        info!(connection = id, seat = %entry.seat, players = self.entries.len(), "Player left");
        Some(entry.seat)
    }

    /// Seat held by `id`, if it is registered.
    pub fn seat_of(&self, id: ConnectionId) -> Option<Seat> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.seat)
    }

    /// Entry for `id`, if it is registered.
    pub fn get(&self, id: ConnectionId) -> Option<&PlayerEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entry holding `seat`, if any.
    pub fn by_seat(&self, seat: Seat) -> Option<&PlayerEntry> {
        self.entries.iter().find(|e| e.seat == seat)
    }

    /// All live entries in join order.
    pub fn entries(&self) -> &[PlayerEntry] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_PLAYERS
    }
}
