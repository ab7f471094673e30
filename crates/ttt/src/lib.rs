//! TTT Client - Terminal front end for the tic-tac-toe server
//!
//! The client is a thin relay: every line the server sends is printed as
//! is, and every line typed by the player is forwarded. All game rules
//! live on the server.

pub mod client;
pub mod error;

pub use client::{ClientConfig, ClientExit, GameClient};
pub use error::{ClientError, Result};
