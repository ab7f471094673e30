//! Error types for the client.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use thiserror::Error;

/// Client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to reach the server.
    ///
    /// Usually means no server is listening on `addr`.
    #[error("Error connecting to server {addr}: {error}")]
    Connect { addr: String, error: String },

    /// Reading from or writing to the server or terminal failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
