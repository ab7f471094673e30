//! TCP server for the tic-tac-toe daemon.
//!
//! The server:
//! - Listens on a TCP address for player connections
//! - Seats the first two connections and rejects the rest
//! - Spawns a ConnectionHandler for each seated player
//! - Drives a single SessionLoop and returns its outcome
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   GameServer    │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│ TurnCoordinator │
//! │   (per player)  │     │                 │
//! └─────────────────┘     └────────┬────────┘
//!                                  │ turn events
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │   SessionLoop   │──▶ Broadcaster
//!                         └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Accept errors are logged and allow continued operation

mod broadcast;
mod connection;

pub use broadcast::Broadcaster;
pub use connection::{
    close_writer, write_frame, write_frame_to, ConnectionError, ConnectionHandler, MAX_LINE_LEN,
};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ttt_core::Mark;
use ttt_protocol::ServerMessage;

use crate::config::ServerConfig;
use crate::coordinator::{SessionOutcome, TurnCoordinator};
use crate::registry::{player_writer, ConnectionId};
use crate::session::SessionLoop;

/// TCP server hosting one game.
pub struct GameServer {
    /// Bound listener
    listener: TcpListener,

    /// Effective configuration
    config: ServerConfig,

    /// Shared turn coordinator
    coordinator: TurnCoordinator,

    /// Outbound sender shared by the session and handlers
    broadcaster: Broadcaster,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating connection IDs
    connection_counter: AtomicU64,
}

impl GameServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// `ServerError::Bind` if the address cannot be bound. This is fatal
    /// for the process.
    pub async fn bind(
        config: ServerConfig,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.addr.clone(),
                error: e.to_string(),
            })?;

        let coordinator = TurnCoordinator::new();
        let broadcaster = Broadcaster::new(coordinator.clone(), config.write_timeout());

        Ok(Self {
            listener,
            config,
            coordinator,
            broadcaster,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Bind {
                addr: self.config.addr.clone(),
                error: e.to_string(),
            })
    }

    /// Returns a handle to the coordinator.
    pub fn coordinator(&self) -> TurnCoordinator {
        self.coordinator.clone()
    }

    /// Runs the server.
    ///
    /// Accepts connections until the session finishes or the cancellation
    /// token is triggered. Returns the session outcome, or `None` when shut
    /// down before the game ended.
    pub async fn run(self) -> Result<Option<SessionOutcome>, ServerError> {
        info!(addr = %self.config.addr, "Server listening, waiting for players");

        let session = SessionLoop::new(self.coordinator.clone(), self.broadcaster.clone()).run();
        tokio::pin!(session);

        let outcome = loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break None;
                }

                outcome = &mut session => {
                    break Some(outcome);
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let id = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            debug!(connection = id, peer = %addr, "Accepted connection");
                            self.handle_connection(stream, id);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        };

        // Stop any handler still reading
        self.cancel_token.cancel();
        info!(outcome = ?outcome, "Server stopped");
        Ok(outcome)
    }

    /// Seats a new connection and spawns its handler, or turns it away.
    fn handle_connection(&self, stream: TcpStream, id: ConnectionId) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(connection = id, error = %e, "Failed to set TCP_NODELAY");
        }
        let (reader, writer) = stream.into_split();
        let writer = player_writer(writer);
        let coordinator = self.coordinator.clone();
        let broadcaster = self.broadcaster.clone();
        let cancel_token = self.cancel_token.clone();
        let write_timeout = self.config.write_timeout();

        tokio::spawn(async move {
            // Held until the greeting is out so no broadcast can overtake it
            let mut guard = writer.lock().await;

            match coordinator.register(id, writer.clone()).await {
                Ok(seat) => {
                    let welcome = ServerMessage::Welcome {
                        mark: Mark::for_seat(seat),
                    };
                    let greeted = write_frame_to(&mut *guard, &welcome.to_frame(), write_timeout).await;
                    drop(guard);

                    if let Err(e) = greeted {
                        debug!(connection = id, error = %e, "Failed to greet player");
                        coordinator.unregister(id).await;
                        return;
                    }
                    debug!(connection = id, seat = %seat, "Greeted player");
                    ConnectionHandler::new(reader, id, coordinator, broadcaster, cancel_token)
                        .run()
                        .await;
                }
                Err(e) => {
                    warn!(connection = id, error = %e, "Turning connection away");
                    let frame = ServerMessage::GameFull.to_frame();
                    if let Err(e) = write_frame_to(&mut *guard, &frame, write_timeout).await {
                        debug!(connection = id, error = %e, "Failed to notify rejected connection");
                    }
                    drop(guard);
                    close_writer(&writer, write_timeout).await;
                }
            }
        });
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },
}
