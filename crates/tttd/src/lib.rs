//! TTT Daemon - Two-player tic-tac-toe server
//!
//! This crate provides the server side of the game:
//! - `registry` - Seat assignment for live player connections
//! - `coordinator` - Turn coordination over the shared game state
//! - `session` - Top-level control flow for one game
//! - `server` - TCP listener, per-connection handlers and broadcasting
//! - `config` - Server configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        tttd server                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │   GameServer    │────▶│      TurnCoordinator        │    │
//! │  │ (TcpListener)   │     │ Mutex<GameState + Registry> │    │
//! │  └────────┬────────┘     └──────────────┬──────────────┘    │
//! │           │                             │ oneshot per turn  │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │ConnectionHandler│     │        SessionLoop          │    │
//! │  │  (per player)   │     │  prompts, waits, announces  │    │
//! │  └─────────────────┘     └──────────────┬──────────────┘    │
//! │                                         │                   │
//! │                          ┌──────────────▼──────────────┐    │
//! │                          │        Broadcaster          │    │
//! │                          └─────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod coordinator;
pub mod registry;
pub mod server;
pub mod session;
