//! TTT Protocol - Wire protocol between players and the server
//!
//! Both directions carry newline-delimited UTF-8 text. Players send
//! `"<row> <col>"` or `"quit"`; the server sends status lines and the
//! rendered board.

pub mod message;
pub mod parse;

pub use message::ServerMessage;
pub use parse::{parse_command, ClientCommand, ParseError, QUIT};

/// Address the server listens on and the client dials by default.
pub const DEFAULT_ADDR: &str = "localhost:8080";

/// Environment variable overriding [`DEFAULT_ADDR`].
pub const ADDR_ENV: &str = "TTT_ADDR";
