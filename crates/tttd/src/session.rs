//! Session loop - top-level control flow for one game.
//!
//! ```text
//! wait for 2 players ─▶ "Game started!" + board
//!        ┌──────────────────────────────────────────┐
//!        ▼                                          │
//!   "Player X's turn" ─▶ prompt active seat ─▶ await move ─▶ board ─┘
//!        │ terminal
//!        ▼
//!   announce result (skipped on abort) ─▶ close connections
//! ```

use tracing::{debug, info};

use ttt_protocol::ServerMessage;

use crate::coordinator::{SessionOutcome, TurnCoordinator, TurnEvent, TurnStart};
use crate::server::Broadcaster;

/// Drives a single game from lobby to teardown.
pub struct SessionLoop {
    coordinator: TurnCoordinator,
    broadcaster: Broadcaster,
}

impl SessionLoop {
    pub fn new(coordinator: TurnCoordinator, broadcaster: Broadcaster) -> Self {
        Self {
            coordinator,
            broadcaster,
        }
    }

    /// Runs the session to completion and returns how it ended.
    pub async fn run(self) -> SessionOutcome {
        loop {
            self.coordinator.wait_for_players().await;
            if self.coordinator.start().await {
                break;
            }
            debug!("Player left before the game could start");
        }

        info!("Game started");
        self.broadcaster.send_to_all(&ServerMessage::GameStarted).await;
        let grid = self.coordinator.grid().await;
        self.broadcaster.send_to_all(&ServerMessage::Board(grid)).await;

        let outcome = self.play().await;
        info!(outcome = ?outcome, "Game finished");

        let announcement = match outcome {
            SessionOutcome::Win(mark) => ServerMessage::Winner { mark },
            SessionOutcome::Draw => ServerMessage::Draw,
            SessionOutcome::Aborted => ServerMessage::Aborted,
        };
        self.broadcaster.send_to_all(&announcement).await;
        self.broadcaster.close_all().await;

        outcome
    }

    /// Alternates turns until the coordinator reaches a terminal state.
    async fn play(&self) -> SessionOutcome {
        loop {
            let turn = match self.coordinator.begin_turn().await {
                TurnStart::Armed(turn) => turn,
                TurnStart::Finished(outcome) => return outcome,
            };

            let seat = turn.seat();
            self.broadcaster
                .send_to_all(&ServerMessage::Turn { mark: turn.mark() })
                .await;
            if let Err(e) = self
                .broadcaster
                .send_to_seat(seat, &ServerMessage::Prompt)
                .await
            {
                debug!(seat = %seat, error = %e, "Failed to prompt player");
            }

            match turn.await_move_completion().await {
                TurnEvent::Moved { applied, grid } => {
                    debug!(
                        seat = %applied.seat,
                        row = applied.row,
                        col = applied.col,
                        "Turn complete"
                    );
                    self.broadcaster.send_to_all(&ServerMessage::Board(grid)).await;
                }
                TurnEvent::Aborted => return SessionOutcome::Aborted,
            }
        }
    }
}
