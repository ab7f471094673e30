//! Connection handler for individual player connections.
//!
//! Each seated player gets its own `ConnectionHandler` that:
//! - Reads newline-delimited lines
//! - Parses them into commands
//! - Submits moves to the coordinator
//! - Replies with rejections to this player only
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors are logged and result in unregistration

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ttt_core::{MoveError, Seat};
use ttt_protocol::{parse_command, ClientCommand, ServerMessage};

use crate::coordinator::TurnCoordinator;
use crate::registry::{ConnectionId, PlayerWriter};

use super::Broadcaster;

/// Maximum inbound line length in bytes, excluding the newline
pub const MAX_LINE_LEN: usize = 1024;

/// Connection handler for a single seated player.
pub struct ConnectionHandler<R> {
    /// Buffered reader for incoming lines
    reader: BufReader<R>,

    /// Connection identifier assigned at accept time
    id: ConnectionId,

    /// Shared turn coordinator
    coordinator: TurnCoordinator,

    /// Used for replies to this player
    broadcaster: Broadcaster,

    /// Stops the handler when the server shuts down
    cancel_token: CancellationToken,
}

impl<R> ConnectionHandler<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `reader` - Read half of the player's stream
    /// * `id` - Identifier of an already registered connection
    /// * `coordinator` - Shared turn coordinator
    /// * `broadcaster` - Outbound message sender
    /// * `cancel_token` - Token for server shutdown
    pub fn new(
        reader: R,
        id: ConnectionId,
        coordinator: TurnCoordinator,
        broadcaster: Broadcaster,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            reader: BufReader::new(reader),
            id,
            coordinator,
            broadcaster,
            cancel_token,
        }
    }

    /// Runs the read loop until the player quits, disconnects, or the
    /// server shuts down, then unregisters the connection.
    pub async fn run(mut self) {
        debug!(connection = self.id, "Reading player input");
        let mut buf = Vec::with_capacity(MAX_LINE_LEN);

        loop {
            let result = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!(connection = self.id, "Handler shutting down");
                    break;
                }

                result = read_line(&mut self.reader, &mut buf) => result,
            };

            match result {
                Ok(line) => {
                    // A move parked between turns must not outlive shutdown
                    let keep_reading = tokio::select! {
                        _ = self.cancel_token.cancelled() => {
                            debug!(connection = self.id, "Handler shutting down");
                            false
                        }
                        keep_reading = self.handle_line(&line) => keep_reading,
                    };
                    if !keep_reading {
                        break;
                    }
                }
                Err(ConnectionError::Eof) => {
                    debug!(connection = self.id, "Player sent EOF");
                    break;
                }
                Err(ConnectionError::LineTooLong { size, max }) => {
                    debug!(connection = self.id, size, max, "Discarding oversized line");
                    self.reject_unparsed(MoveError::MalformedInput).await;
                }
                Err(ConnectionError::InvalidUtf8) => {
                    debug!(connection = self.id, "Discarding undecodable line");
                    self.reject_unparsed(MoveError::MalformedInput).await;
                }
                Err(e) => {
                    warn!(connection = self.id, error = %e, "Read failed");
                    break;
                }
            }
        }

        if let Some(seat) = self.coordinator.unregister(self.id).await {
            info!(connection = self.id, seat = %seat, "Player disconnected");
        }
    }

    /// Handles one line. Returns false when the player asked to quit.
    async fn handle_line(&self, line: &str) -> bool {
        debug!(connection = self.id, line, "Received line");

        match parse_command(line) {
            Ok(ClientCommand::Quit) => {
                debug!(connection = self.id, "Player quit");
                false
            }
            Ok(ClientCommand::Move { row, col }) => {
                if let Err(e) = self.coordinator.submit_move(self.id, row, col).await {
                    self.reply(e).await;
                }
                true
            }
            Err(parse_error) => {
                self.reject_unparsed(MoveError::from(parse_error)).await;
                true
            }
        }
    }

    /// Rejects a line that is not a move. Turn order is reported before
    /// input format.
    async fn reject_unparsed(&self, format_error: MoveError) {
        let error = match self.coordinator.check_turn(self.id).await {
            Err(turn_error) => turn_error,
            Ok(()) => format_error,
        };
        self.reply(error).await;
    }

    async fn reply(&self, error: MoveError) {
        debug!(connection = self.id, error = ?error, "Rejecting input");
        if let Err(e) = self
            .broadcaster
            .send_to_one(self.id, &ServerMessage::Rejected(error))
            .await
        {
            debug!(connection = self.id, error = %e, "Failed to send rejection");
        }
    }
}

/// Reads one line into `buf` and returns it without its terminator.
///
/// At most `MAX_LINE_LEN` bytes are ever held in `buf`. The remainder of a
/// longer line is consumed and dropped up to the next newline.
async fn read_line<R>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
) -> Result<String, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    let mut dropped = 0;

    loop {
        let available = reader
            .fill_buf()
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        if available.is_empty() {
            return Err(ConnectionError::Eof);
        }

        let newline = available.iter().position(|&b| b == b'\n');
        let chunk = match newline {
            Some(end) => available.get(..end).unwrap_or(available),
            None => available,
        };
        let consumed = chunk.len() + usize::from(newline.is_some());

        if dropped == 0 && buf.len() + chunk.len() <= MAX_LINE_LEN {
            buf.extend_from_slice(chunk);
        } else {
            dropped += chunk.len();
        }
        reader.consume(consumed);

        if newline.is_some() {
            break;
        }
    }

    if dropped > 0 {
        return Err(ConnectionError::LineTooLong {
            size: buf.len() + dropped,
            max: MAX_LINE_LEN,
        });
    }

    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    std::str::from_utf8(buf)
        .map(str::to_owned)
        .map_err(|_| ConnectionError::InvalidUtf8)
}

/// Writes one newline-terminated frame, bounded by `write_timeout`.
pub async fn write_frame(
    writer: &PlayerWriter,
    frame: &str,
    write_timeout: Duration,
) -> Result<(), ConnectionError> {
    let mut writer = writer.lock().await;
    write_frame_to(&mut *writer, frame, write_timeout).await
}

/// Writes one frame to a writer the caller already holds.
pub async fn write_frame_to<W>(
    writer: &mut W,
    frame: &str,
    write_timeout: Duration,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    match timeout(write_timeout, async {
        writer.write_all(frame.as_bytes()).await?;
        if !frame.ends_with('\n') {
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;
        Ok::<(), std::io::Error>(())
    })
    .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout),
    }
}

/// Flushes and shuts down the write half.
pub async fn close_writer(writer: &PlayerWriter, write_timeout: Duration) {
    let mut writer = writer.lock().await;
    if let Ok(Err(e)) = timeout(write_timeout, writer.shutdown()).await {
        debug!(error = %e, "Failed to shut down connection");
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Line too large: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },

    #[error("Line is not valid UTF-8")]
    InvalidUtf8,

    #[error("Connection {0} is not registered")]
    NotRegistered(ConnectionId),

    #[error("No player in seat {0}")]
    SeatEmpty(Seat),
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::registry::player_writer;

    #[tokio::test]
    async fn test_read_line_strips_terminator() {
        let mut reader = BufReader::new(&b"1 2\r\nquit\n"[..]);
        let mut buf = Vec::new();
        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), "1 2");
        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), "quit");
        assert!(matches!(
            read_line(&mut reader, &mut buf).await,
            Err(ConnectionError::Eof)
        ));
    }

    #[tokio::test]
    async fn test_read_line_rejects_oversized() {
        let mut input = vec![b'1'; MAX_LINE_LEN + 10];
        input.push(b'\n');
        input.extend_from_slice(b"0 0\n");
        let mut reader = BufReader::new(&input[..]);
        let mut buf = Vec::new();

        assert!(matches!(
            read_line(&mut reader, &mut buf).await,
            Err(ConnectionError::LineTooLong { size, .. }) if size == MAX_LINE_LEN + 10
        ));
        // The stream stays usable after an oversized line
        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), "0 0");
    }

    #[tokio::test]
    async fn test_read_line_buffer_stays_bounded() {
        let (mut client, server) = tokio::io::duplex(512);
        let sender = tokio::spawn(async move {
            let chunk = [b'7'; 4096];
            for _ in 0..64 {
                client.write_all(&chunk).await.unwrap();
            }
            client.write_all(b"\n2 2\n").await.unwrap();
            client
        });

        let mut reader = BufReader::new(server);
        let mut buf = Vec::with_capacity(MAX_LINE_LEN);
        let capacity = buf.capacity();

        assert!(matches!(
            read_line(&mut reader, &mut buf).await,
            Err(ConnectionError::LineTooLong { size, .. }) if size == 64 * 4096
        ));
        assert_eq!(buf.capacity(), capacity);
        assert!(buf.len() <= MAX_LINE_LEN);

        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), "2 2");
        drop(sender.await.unwrap());
    }

    #[tokio::test]
    async fn test_read_line_reports_invalid_utf8() {
        let mut reader = BufReader::new(&b"\xff\xfe 0\n1 1\n"[..]);
        let mut buf = Vec::new();
        assert!(matches!(
            read_line(&mut reader, &mut buf).await,
            Err(ConnectionError::InvalidUtf8)
        ));
        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), "1 1");
    }

    #[tokio::test]
    async fn test_shutdown_releases_move_waiting_between_turns() {
        let coordinator = TurnCoordinator::new();
        coordinator
            .register(1, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        coordinator
            .register(2, player_writer(tokio::io::sink()))
            .await
            .unwrap();
        assert!(coordinator.start().await);

        let (mut client, server) = tokio::io::duplex(256);
        let broadcaster = Broadcaster::new(coordinator.clone(), Duration::from_secs(1));
        let cancel_token = CancellationToken::new();
        let handler = ConnectionHandler::new(
            server,
            1,
            coordinator.clone(),
            broadcaster,
            cancel_token.clone(),
        );
        let task = tokio::spawn(handler.run());

        // No turn is open yet, so this move waits
        client.write_all(b"0 0\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        cancel_token.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("handler stopped on shutdown")
            .unwrap();
        assert_eq!(coordinator.seat_of(1).await, None);
        assert_eq!(coordinator.game().await.filled(), 0);
    }

    #[tokio::test]
    async fn test_write_frame_appends_newline_once() {
        let (client, server) = tokio::io::duplex(256);
        let writer = player_writer(server);

        write_frame(&writer, "hello", Duration::from_secs(1))
            .await
            .unwrap();
        write_frame(&writer, "board\n\n", Duration::from_secs(1))
            .await
            .unwrap();
        close_writer(&writer, Duration::from_secs(1)).await;

        let mut received = String::new();
        let mut client = client;
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "hello\nboard\n\n");
    }

    #[tokio::test]
    async fn test_write_frame_reports_closed_peer() {
        let (client, server) = tokio::io::duplex(256);
        drop(client);
        let writer = player_writer(server);
        assert!(matches!(
            write_frame(&writer, "hello", Duration::from_secs(1)).await,
            Err(ConnectionError::Io(_))
        ));
    }

    #[test]
    fn test_line_too_long_display() {
        let err = ConnectionError::LineTooLong {
            size: 2_000,
            max: MAX_LINE_LEN,
        };
        assert!(err.to_string().contains("2000"));
    }
}
