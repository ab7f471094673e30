//! Server connection for the terminal client.
//!
//! This module provides the `GameClient` which handles:
//! - Connecting to the server over TCP
//! - Printing every server line verbatim
//! - Forwarding each input line to the server
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use ttt_protocol::{DEFAULT_ADDR, QUIT};

/// Printed before connecting.
pub const BANNER: &str = "Tic Tac Toe Client";

/// Printed once connected.
pub const USAGE: &str = "Enter your moves in the format 'row col'. Type 'quit' to exit.";

/// Printed when the server ends the stream.
pub const SERVER_CLOSED: &str = "Server connection closed.";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the game client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port` of the server.
    pub addr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
        }
    }
}

/// Why the client stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// The player typed `quit`.
    Quit,
    /// The server closed the connection.
    ServerClosed,
    /// The input stream ended.
    InputClosed,
}

// ============================================================================
// Game Client
// ============================================================================

/// Relays lines between a player's terminal and the server.
pub struct GameClient {
    config: ClientConfig,
}

impl GameClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Runs the client on the process's stdin and stdout.
    pub async fn run(&self) -> Result<ClientExit> {
        let input = BufReader::new(tokio::io::stdin());
        let mut output = tokio::io::stdout();
        self.run_with(input, &mut output).await
    }

    /// Runs the client over arbitrary input and output streams.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connect` if the server cannot be reached
    /// - `ClientError::Io` if the connection or either stream fails
    pub async fn run_with<I, O>(&self, input: I, output: &mut O) -> Result<ClientExit>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        print_line(output, BANNER).await?;

        let stream = TcpStream::connect(&self.config.addr)
            .await
            .map_err(|e| ClientError::Connect {
                addr: self.config.addr.clone(),
                error: e.to_string(),
            })?;
        info!(addr = %self.config.addr, "Connected to server");

        let (reader, mut writer) = stream.into_split();
        let mut server_lines = BufReader::new(reader).lines();
        let mut input_lines = input.lines();

        print_line(output, USAGE).await?;

        loop {
            tokio::select! {
                // Drain what the server said before sending more
                biased;

                line = server_lines.next_line() => {
                    match line? {
                        Some(line) => print_line(output, &line).await?,
                        None => {
                            print_line(output, SERVER_CLOSED).await?;
                            return Ok(ClientExit::ServerClosed);
                        }
                    }
                }

                line = input_lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        writer.shutdown().await?;
                        return Ok(ClientExit::InputClosed);
                    };

                    debug!(input = %line, "Sending input");
                    writer.write_all(format!("{line}\n").as_bytes()).await?;

                    if line.trim() == QUIT {
                        writer.shutdown().await?;
                        return Ok(ClientExit::Quit);
                    }
                }
            }
        }
    }
}

async fn print_line<O>(output: &mut O, line: &str) -> Result<()>
where
    O: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
