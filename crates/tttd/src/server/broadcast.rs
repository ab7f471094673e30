//! Outbound delivery to seated players.
//!
//! Recipients are snapshotted from the coordinator, then written to after
//! the coordinator lock has been released. A failed write unregisters the
//! failing player; delivery to the others continues.

use std::time::Duration;

use tracing::debug;

use ttt_core::Seat;
use ttt_protocol::ServerMessage;

use crate::coordinator::TurnCoordinator;
use crate::registry::ConnectionId;

use super::connection::{close_writer, write_frame, ConnectionError};

/// Sends frames to one or all registered players.
#[derive(Clone)]
pub struct Broadcaster {
    coordinator: TurnCoordinator,
    write_timeout: Duration,
}

impl Broadcaster {
    pub fn new(coordinator: TurnCoordinator, write_timeout: Duration) -> Self {
        Self {
            coordinator,
            write_timeout,
        }
    }

    /// Best-effort delivery to every registered player.
    ///
    /// Returns the number of players the frame reached.
    pub async fn send_to_all(&self, msg: &ServerMessage) -> usize {
        let frame = msg.to_frame();
        let recipients = self.coordinator.recipients().await;

        let mut delivered = 0;
        let mut failed = Vec::new();
        for entry in &recipients {
            match write_frame(&entry.writer, &frame, self.write_timeout).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(
                        connection = entry.id,
                        seat = %entry.seat,
                        error = %e,
                        "Failed to send to player"
                    );
                    failed.push(entry.id);
                }
            }
        }

        for id in failed {
            self.coordinator.unregister(id).await;
        }

        delivered
    }

    /// Sends a frame to a single connection.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::NotRegistered` if `id` holds no seat
    /// - Write errors, after which the connection has been unregistered
    pub async fn send_to_one(
        &self,
        id: ConnectionId,
        msg: &ServerMessage,
    ) -> Result<(), ConnectionError> {
        let entry = self
            .coordinator
            .recipient(id)
            .await
            .ok_or(ConnectionError::NotRegistered(id))?;

        if let Err(e) = write_frame(&entry.writer, &msg.to_frame(), self.write_timeout).await {
            debug!(connection = id, error = %e, "Failed to send to player");
            self.coordinator.unregister(id).await;
            return Err(e);
        }
        Ok(())
    }

    /// Sends a frame to whoever holds `seat`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::SeatEmpty` if nobody holds `seat`
    /// - Any error from [`Broadcaster::send_to_one`]
    pub async fn send_to_seat(
        &self,
        seat: Seat,
        msg: &ServerMessage,
    ) -> Result<(), ConnectionError> {
        let id = self
            .coordinator
            .recipient_for_seat(seat)
            .await
            .map(|entry| entry.id)
            .ok_or(ConnectionError::SeatEmpty(seat))?;
        self.send_to_one(id, msg).await
    }

    /// Shuts down the write half of every registered connection.
    pub async fn close_all(&self) {
        for entry in self.coordinator.recipients().await {
            close_writer(&entry.writer, self.write_timeout).await;
        }
    }
}
