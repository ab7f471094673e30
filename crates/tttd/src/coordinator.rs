//! Turn coordinator - the single owner of shared game state.
//!
//! The coordinator keeps the [`GameState`], the [`ConnectionRegistry`] and
//! the turn phase behind one mutex. The lock is only ever held for
//! in-memory work; callers snapshot what they need and write to sockets
//! after it is released.
//!
//! # Turn protocol
//!
//! ```text
//!   Lobby ──start()──▶ MoveApplied ──begin_turn()──▶ AwaitingMove(seat)
//!                          ▲                               │
//!                          └────────── submit_move() ──────┤
//!                                                          ▼
//!                                  Terminal(Win | Draw | Aborted)
//! ```
//!
//! Each `begin_turn()` creates a fresh oneshot channel. The accepted move
//! (or an abort) consumes its sender, so exactly one event is delivered
//! per turn and nothing can be queued for a turn that was never armed.
//! Submissions that arrive while the previous move is still being
//! processed park on a [`Notify`] until the next turn is armed.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A dropped turn signal is reported as an abort, never a panic

use std::sync::Arc;

use tokio::sync::{oneshot, watch, Mutex, Notify};
use tracing::{debug, info, warn};

use ttt_core::{GameResult, GameState, Grid, Mark, MoveApplied, MoveError, Seat};

use crate::registry::{ConnectionId, ConnectionRegistry, PlayerEntry, PlayerWriter, RegistryError};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Win(Mark),
    Draw,
    /// A player left before the game finished.
    Aborted,
}

impl SessionOutcome {
    fn from_result(result: GameResult) -> Option<Self> {
        match result {
            GameResult::Pending => None,
            GameResult::Win(mark) => Some(SessionOutcome::Win(mark)),
            GameResult::Draw => Some(SessionOutcome::Draw),
        }
    }
}

/// Coordinator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Waiting for both seats to fill.
    Lobby,
    /// No turn is armed: the game just started, or a move was accepted and
    /// the session loop has not yet opened the next turn.
    MoveApplied,
    /// Exactly one move from this seat will be accepted.
    AwaitingMove(Seat),
    /// Absorbing end state.
    Terminal(SessionOutcome),
}

/// Event that completes a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// The active seat's move was accepted.
    Moved { applied: MoveApplied, grid: Grid },
    /// The session was aborted while the turn was open.
    Aborted,
}

/// Result of asking the coordinator to open a turn.
#[derive(Debug)]
pub enum TurnStart {
    /// A turn is open; await its completion.
    Armed(PendingTurn),
    /// The session already ended.
    Finished(SessionOutcome),
}

/// An open turn. Single-use: consumed by [`PendingTurn::await_move_completion`].
#[derive(Debug)]
pub struct PendingTurn {
    seat: Seat,
    mark: Mark,
    completion: oneshot::Receiver<TurnEvent>,
}

impl PendingTurn {
    /// Seat expected to move.
    pub fn seat(&self) -> Seat {
        self.seat
    }

    /// Mark that seat plays.
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Suspends until the active seat's move is accepted or the session
    /// aborts. This is the session loop's only suspension point per turn.
    pub async fn await_move_completion(self) -> TurnEvent {
        match self.completion.await {
            Ok(event) => event,
            Err(_) => {
                warn!(seat = %self.seat, "Turn signal dropped, treating as abort");
                TurnEvent::Aborted
            }
        }
    }
}

/// State protected by the coordinator lock.
struct Shared {
    game: GameState,
    registry: ConnectionRegistry,
    phase: TurnPhase,
    /// Sender half of the open turn's rendezvous.
    turn_signal: Option<oneshot::Sender<TurnEvent>>,
}

struct Inner {
    shared: Mutex<Shared>,
    /// Woken whenever the phase leaves `MoveApplied`.
    turn_armed: Notify,
    /// Number of seated players, for the lobby wait.
    seats: watch::Sender<usize>,
}

/// Cheap-to-clone handle to the session's shared state.
#[derive(Clone)]
pub struct TurnCoordinator {
    inner: Arc<Inner>,
}

impl Default for TurnCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnCoordinator {
    /// Creates a coordinator for a fresh game with no players.
    pub fn new() -> Self {
        let (seats, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    game: GameState::new(),
                    registry: ConnectionRegistry::new(),
                    phase: TurnPhase::Lobby,
                    turn_signal: None,
                }),
                turn_armed: Notify::new(),
                seats,
            }),
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Seats a new connection.
    ///
    /// # Errors
    ///
    /// - `RegistryError::Full` when both seats are taken
    /// - `RegistryError::SessionStarted` once the game has left the lobby
    /// - `RegistryError::AlreadyRegistered` for a duplicate id
    pub async fn register(
        &self,
        id: ConnectionId,
        writer: PlayerWriter,
    ) -> Result<Seat, RegistryError> {
        let mut shared = self.inner.shared.lock().await;
        if shared.phase != TurnPhase::Lobby {
            return Err(RegistryError::SessionStarted);
        }
        let seat = shared.registry.register(id, writer)?;
        self.inner.seats.send_replace(shared.registry.len());
        Ok(seat)
    }

    /// Removes a connection.
    ///
    /// While a game is in progress this also aborts the session once fewer
    /// than two players remain, and releases a session loop blocked in
    /// [`PendingTurn::await_move_completion`]. Both happen under the same
    /// lock as the removal.
    pub async fn unregister(&self, id: ConnectionId) -> Option<Seat> {
        let mut shared = self.inner.shared.lock().await;
        let seat = shared.registry.unregister(id)?;
        self.inner.seats.send_replace(shared.registry.len());

        let in_progress = matches!(
            shared.phase,
            TurnPhase::MoveApplied | TurnPhase::AwaitingMove(_)
        );
        if in_progress && shared.registry.len() < 2 {
            info!(seat = %seat, "Player left mid-game, aborting session");
            shared.phase = TurnPhase::Terminal(SessionOutcome::Aborted);
            if let Some(signal) = shared.turn_signal.take() {
                let _ = signal.send(TurnEvent::Aborted);
            }
            drop(shared);
            self.inner.turn_armed.notify_waiters();
        }

        Some(seat)
    }

    /// Seat held by a connection.
    pub async fn seat_of(&self, id: ConnectionId) -> Option<Seat> {
        self.inner.shared.lock().await.registry.seat_of(id)
    }

    /// Snapshot of every seated player, for broadcasting.
    pub async fn recipients(&self) -> Vec<PlayerEntry> {
        self.inner.shared.lock().await.registry.entries().to_vec()
    }

    /// Snapshot of one player's entry.
    pub async fn recipient(&self, id: ConnectionId) -> Option<PlayerEntry> {
        self.inner.shared.lock().await.registry.get(id).cloned()
    }

    /// Snapshot of the player in `seat`.
    pub async fn recipient_for_seat(&self, seat: Seat) -> Option<PlayerEntry> {
        self.inner.shared.lock().await.registry.by_seat(seat).cloned()
    }

    /// Waits until both seats are filled.
    pub async fn wait_for_players(&self) {
        let mut seats = self.inner.seats.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = seats.wait_for(|count| *count >= 2).await;
    }

    // ========================================================================
    // Turns
    // ========================================================================

    /// Leaves the lobby if both seats are filled. Returns false if a player
    /// left before the session could start.
    pub async fn start(&self) -> bool {
        let mut shared = self.inner.shared.lock().await;
        if shared.phase != TurnPhase::Lobby || !shared.registry.is_full() {
            return false;
        }
        shared.phase = TurnPhase::MoveApplied;
        info!("Session started");
        true
    }

    /// Opens the next turn for the game's active seat.
    pub async fn begin_turn(&self) -> TurnStart {
        let mut shared = self.inner.shared.lock().await;
        match shared.phase {
            TurnPhase::Terminal(outcome) => return TurnStart::Finished(outcome),
            TurnPhase::Lobby | TurnPhase::AwaitingMove(_) => {
                warn!(phase = ?shared.phase, "Turn opened outside of MoveApplied");
            }
            TurnPhase::MoveApplied => {}
        }
        if shared.registry.len() < 2 {
            shared.phase = TurnPhase::Terminal(SessionOutcome::Aborted);
            drop(shared);
            self.inner.turn_armed.notify_waiters();
            return TurnStart::Finished(SessionOutcome::Aborted);
        }

        let seat = shared.game.active_seat();
        let mark = shared.game.active_mark();
        let (signal, completion) = oneshot::channel();
        shared.turn_signal = Some(signal);
        shared.phase = TurnPhase::AwaitingMove(seat);
        drop(shared);

        debug!(seat = %seat, mark = %mark, "Turn armed");
        self.inner.turn_armed.notify_waiters();

        TurnStart::Armed(PendingTurn {
            seat,
            mark,
            completion,
        })
    }

    /// Submits a move on behalf of a connection.
    ///
    /// If the previous move is still being processed the call waits for the
    /// next turn to open before validating.
    ///
    /// # Errors
    ///
    /// - `MoveError::GameOver` once the session is terminal
    /// - `MoveError::OutOfTurn` if the sender is not seated, the game has
    ///   not started, or another seat is expected
    /// - `MoveError::OutOfBounds` / `MoveError::CellOccupied` from the game
    pub async fn submit_move(
        &self,
        id: ConnectionId,
        row: usize,
        col: usize,
    ) -> Result<MoveApplied, MoveError> {
        loop {
            let armed = {
                let mut shared = self.inner.shared.lock().await;
                let seat = shared.registry.seat_of(id).ok_or(MoveError::OutOfTurn)?;
                let phase = shared.phase;

                match phase {
                    TurnPhase::Terminal(_) => return Err(MoveError::GameOver),
                    TurnPhase::Lobby => return Err(MoveError::OutOfTurn),
                    TurnPhase::AwaitingMove(expected) => {
                        if seat != expected {
                            debug!(connection = id, seat = %seat, expected = %expected, "Move out of turn");
                            return Err(MoveError::OutOfTurn);
                        }
                        let applied = shared.game.apply_move(seat, row, col)?;
                        shared.phase = match SessionOutcome::from_result(applied.result) {
                            Some(outcome) => TurnPhase::Terminal(outcome),
                            None => TurnPhase::MoveApplied,
                        };
                        let grid = shared.game.grid().clone();
                        if let Some(signal) = shared.turn_signal.take() {
                            let _ = signal.send(TurnEvent::Moved { applied, grid });
                        }
                        return Ok(applied);
                    }
                    TurnPhase::MoveApplied => self.inner.turn_armed.notified(),
                }
            };

            debug!(connection = id, "Move arrived between turns, waiting");
            armed.await;
        }
    }

    /// Checks whether `id` may move right now, without submitting anything.
    pub async fn check_turn(&self, id: ConnectionId) -> Result<(), MoveError> {
        let shared = self.inner.shared.lock().await;
        let seat = shared.registry.seat_of(id).ok_or(MoveError::OutOfTurn)?;
        match shared.phase {
            TurnPhase::Terminal(_) => Err(MoveError::GameOver),
            TurnPhase::AwaitingMove(expected) if expected == seat => Ok(()),
            TurnPhase::MoveApplied if shared.game.active_seat() == seat => Ok(()),
            _ => Err(MoveError::OutOfTurn),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub async fn phase(&self) -> TurnPhase {
        self.inner.shared.lock().await.phase
    }

    pub async fn grid(&self) -> Grid {
        self.inner.shared.lock().await.game.grid().clone()
    }

    pub async fn game(&self) -> GameState {
        self.inner.shared.lock().await.game.clone()
    }

    pub async fn player_count(&self) -> usize {
        self.inner.shared.lock().await.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::registry::player_writer;

    const X_ID: ConnectionId = 1;
    const O_ID: ConnectionId = 2;

    async fn started() -> TurnCoordinator {
        let coordinator = TurnCoordinator::new();
        coordinator
            .register(X_ID, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        coordinator
            .register(O_ID, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        assert!(coordinator.start().await);
        coordinator
    }

    fn armed(start: TurnStart) -> PendingTurn {
        match start {
            TurnStart::Armed(turn) => turn,
            TurnStart::Finished(outcome) => panic!("expected open turn, got {outcome:?}"),
        }
    }

    #[tokio::test]
    async fn test_moves_rejected_in_lobby() {
        let coordinator = TurnCoordinator::new();
        coordinator
            .register(X_ID, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        assert!(!coordinator.start().await);
        assert_eq!(
            coordinator.submit_move(X_ID, 0, 0).await,
            Err(MoveError::OutOfTurn)
        );
    }

    #[tokio::test]
    async fn test_accepted_move_completes_turn() {
        let coordinator = started().await;
        let turn = armed(coordinator.begin_turn().await);
        assert_eq!(turn.seat(), Seat::FIRST);
        assert_eq!(turn.mark(), Mark::X);

        let applied = coordinator.submit_move(X_ID, 1, 1).await.unwrap();
        assert_eq!(applied.mark, Mark::X);

        match turn.await_move_completion().await {
            TurnEvent::Moved { applied, grid } => {
                assert_eq!((applied.row, applied.col), (1, 1));
                assert_eq!(grid.filled(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(coordinator.phase().await, TurnPhase::MoveApplied);
    }

    #[tokio::test]
    async fn test_out_of_turn_move_leaves_state_untouched() {
        let coordinator = started().await;
        let _turn = armed(coordinator.begin_turn().await);
        let before = coordinator.game().await;

        assert_eq!(
            coordinator.submit_move(O_ID, 0, 0).await,
            Err(MoveError::OutOfTurn)
        );
        assert_eq!(coordinator.game().await, before);
        assert_eq!(coordinator.phase().await, TurnPhase::AwaitingMove(Seat::FIRST));
    }

    #[tokio::test]
    async fn test_unknown_connection_rejected() {
        let coordinator = started().await;
        let _turn = armed(coordinator.begin_turn().await);
        assert_eq!(
            coordinator.submit_move(99, 0, 0).await,
            Err(MoveError::OutOfTurn)
        );
    }

    #[tokio::test]
    async fn test_occupied_cell_keeps_turn_open() {
        let coordinator = started().await;
        let turn = armed(coordinator.begin_turn().await);
        coordinator.submit_move(X_ID, 0, 0).await.unwrap();
        turn.await_move_completion().await;

        let _turn = armed(coordinator.begin_turn().await);
        assert_eq!(
            coordinator.submit_move(O_ID, 0, 0).await,
            Err(MoveError::CellOccupied)
        );
        assert_eq!(coordinator.game().await.filled(), 1);
        assert_eq!(coordinator.phase().await, TurnPhase::AwaitingMove(Seat::SECOND));
    }

    #[tokio::test]
    async fn test_move_between_turns_waits_for_next_turn() {
        let coordinator = started().await;
        let turn = armed(coordinator.begin_turn().await);
        coordinator.submit_move(X_ID, 0, 0).await.unwrap();
        turn.await_move_completion().await;

        // O moves before the loop opens its turn
        let early = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit_move(O_ID, 2, 2).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(coordinator.game().await.filled(), 1);

        let turn = armed(coordinator.begin_turn().await);
        let result = timeout(Duration::from_secs(1), early)
            .await
            .expect("parked move completes")
            .unwrap();
        assert!(result.is_ok());
        assert!(matches!(
            turn.await_move_completion().await,
            TurnEvent::Moved { .. }
        ));
    }

    #[tokio::test]
    async fn test_disconnect_unblocks_waiting_turn() {
        let coordinator = started().await;
        let turn = armed(coordinator.begin_turn().await);

        let waiter = tokio::spawn(turn.await_move_completion());
        tokio::task::yield_now().await;

        assert_eq!(coordinator.unregister(O_ID).await, Some(Seat::SECOND));

        let event = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait released")
            .unwrap();
        assert_eq!(event, TurnEvent::Aborted);
        assert_eq!(
            coordinator.phase().await,
            TurnPhase::Terminal(SessionOutcome::Aborted)
        );
        assert_eq!(
            coordinator.submit_move(X_ID, 0, 0).await,
            Err(MoveError::GameOver)
        );
    }

    #[tokio::test]
    async fn test_disconnect_between_turns_aborts_next_turn() {
        let coordinator = started().await;
        coordinator.unregister(X_ID).await;
        assert!(matches!(
            coordinator.begin_turn().await,
            TurnStart::Finished(SessionOutcome::Aborted)
        ));
    }

    #[tokio::test]
    async fn test_lobby_disconnect_frees_seat() {
        let coordinator = TurnCoordinator::new();
        coordinator
            .register(X_ID, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        coordinator.unregister(X_ID).await;
        assert_eq!(coordinator.phase().await, TurnPhase::Lobby);
        assert_eq!(
            coordinator
                .register(O_ID, player_writer(tokio::io::sink()))
                .await,
            Ok(Seat::FIRST)
        );
    }

    #[tokio::test]
    async fn test_no_registration_after_start() {
        let coordinator = started().await;
        coordinator.unregister(O_ID).await;
        assert_eq!(
            coordinator
                .register(3, player_writer(tokio::io::sink()))
                .await,
            Err(RegistryError::SessionStarted)
        );
    }

    #[tokio::test]
    async fn test_winning_move_is_terminal() {
        let coordinator = started().await;
        let moves = [
            (X_ID, 0, 0),
            (O_ID, 1, 1),
            (X_ID, 0, 1),
            (O_ID, 2, 2),
            (X_ID, 0, 2),
        ];
        for (id, row, col) in moves {
            let turn = armed(coordinator.begin_turn().await);
            coordinator.submit_move(id, row, col).await.unwrap();
            turn.await_move_completion().await;
        }
        assert_eq!(
            coordinator.phase().await,
            TurnPhase::Terminal(SessionOutcome::Win(Mark::X))
        );
        assert!(matches!(
            coordinator.begin_turn().await,
            TurnStart::Finished(SessionOutcome::Win(Mark::X))
        ));

        // Leaving after the game ended does not turn a win into an abort
        coordinator.unregister(O_ID).await;
        assert_eq!(
            coordinator.phase().await,
            TurnPhase::Terminal(SessionOutcome::Win(Mark::X))
        );
    }

    #[tokio::test]
    async fn test_wait_for_players() {
        let coordinator = TurnCoordinator::new();
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.wait_for_players().await })
        };
        coordinator
            .register(X_ID, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        coordinator
            .register(O_ID, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("lobby wait released")
            .unwrap();
    }
}
