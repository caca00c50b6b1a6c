//! Connection handling
//!
//! Manages individual client connections, parsing RESP commands
//! and sending responses.

use crate::aof::AofError;
use crate::dispatch::Dispatcher;
use crate::protocol::{RespEncoder, RespError, RespParser, RespValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

/// Bytes of undecodable input echoed into the log
const LOGGED_INPUT_LIMIT: usize = 64;

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Buffered bytes may hold a complete frame
    Open,
    /// Waiting for the peer to send more bytes
    AwaitingFrame,
    /// Peer closed or the connection failed
    Closed,
}

/// Why a connection ended abnormally
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),

    /// A committed write could not be appended to the AOF
    #[error("persistence failure: {0}")]
    Persistence(#[from] AofError),
}

/// Connection handler
pub struct Connection<S> {
    /// Client transport
    stream: S,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,

    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new connection handler
    pub fn new(stream: S) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::AwaitingFrame,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handle the connection
    ///
    /// Reads commands from the client, dispatches them one at a time in
    /// arrival order, and sends responses. Returns `Ok` when the peer closes.
    pub async fn handle(&mut self, dispatcher: &Dispatcher) -> Result<(), ConnectionError> {
        let result = self.run(dispatcher).await;
        self.state = ConnectionState::Closed;
        result
    }

    async fn run(&mut self, dispatcher: &Dispatcher) -> Result<(), ConnectionError> {
        loop {
            match self.state {
                ConnectionState::Open => match self.parse_frame()? {
                    Some(frame) => {
                        debug!("Parsed command: {:?}", frame);

                        let response = dispatcher.dispatch(&frame).map_err(|e| {
                            error!("Failed to append to AOF: {}", e);
                            e
                        })?;

                        debug!("Response: {}", response);
                        self.send_response(&response).await?;
                    }
                    None => self.state = ConnectionState::AwaitingFrame,
                },
                ConnectionState::AwaitingFrame => {
                    let n = self.stream.read_buf(&mut self.read_buffer).await?;

                    // Connection closed
                    if n == 0 {
                        if !self.read_buffer.is_empty() {
                            debug!(
                                "Peer closed with {} unparsed bytes",
                                self.read_buffer.len()
                            );
                        }
                        self.state = ConnectionState::Closed;
                    } else {
                        debug!("Read {} bytes", n);
                        self.state = ConnectionState::Open;
                    }
                }
                ConnectionState::Closed => return Ok(()),
            }
        }
    }

    /// Take one complete frame off the front of the read buffer
    fn parse_frame(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        match RespParser::parse(&self.read_buffer) {
            Ok(Some((frame, consumed))) => {
                self.read_buffer.advance(consumed);
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                let shown = self.read_buffer.len().min(LOGGED_INPUT_LIMIT);
                warn!(
                    "Protocol error: {}, closing (input base64: {})",
                    e,
                    STANDARD.encode(&self.read_buffer[..shown])
                );
                Err(e.into())
            }
        }
    }

    /// Send a response to the client
    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        // Encode the response
        self.write_buffer.clear();
        RespEncoder::encode_to(&mut self.write_buffer, response);

        // Write to the socket
        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::{AofWriter, SyncPolicy};
    use std::fs;
    use std::sync::Arc;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_ping() {
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let mut connection = Connection::new(mock);
        connection.handle(&Dispatcher::new()).await.unwrap();
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let mock = Builder::new()
            .read(b"*3\r\n$3\r\nSET")
            .read(b"\r\n$1\r\nk\r\n$1")
            .read(b"\r\nv\r\n")
            .write(b"+OK\r\n")
            .build();

        let dispatcher = Dispatcher::new();
        Connection::new(mock).handle(&dispatcher).await.unwrap();

        assert!(dispatcher.store().contains(b"k"));
    }

    #[tokio::test]
    async fn test_pipelined_frames_answered_in_order() {
        let mock = Builder::new()
            .read(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n*1\r\n$4\r\nPI")
            .write(b"+OK\r\n")
            .write(b"$1\r\nv\r\n")
            .read(b"NG\r\n")
            .write(b"+PONG\r\n")
            .build();

        Connection::new(mock).handle(&Dispatcher::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_replies_keep_connection_open() {
        let mock = Builder::new()
            .read(b"*1\r\n$3\r\nFOO\r\n")
            .write(b"-ERR unknown command 'FOO', with args beginning with: \r\n")
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        Connection::new(mock).handle(&Dispatcher::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_input_closes() {
        let mock = Builder::new().read(b"!garbage\r\n").build();

        let mut connection = Connection::new(mock);
        let result = connection.handle(&Dispatcher::new()).await;

        assert!(matches!(result, Err(ConnectionError::Protocol(_))));
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_peer_close_mid_frame() {
        let mock = Builder::new().read(b"*2\r\n$3\r\nGET\r\n").build();

        let dispatcher = Dispatcher::new();
        Connection::new(mock).handle(&dispatcher).await.unwrap();
    }

    #[tokio::test]
    async fn test_writes_reach_aof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.aof");
        let writer = Arc::new(AofWriter::new(&path, SyncPolicy::Always).unwrap());
        let dispatcher = Dispatcher::new().with_aof_writer(writer);

        let mock = Builder::new()
            .read(b"*2\r\n$4\r\nINCR\r\n$1\r\nn\r\n")
            .write(b":1\r\n")
            .read(b"*2\r\n$3\r\nGET\r\n$1\r\nn\r\n")
            .write(b":1\r\n")
            .build();

        Connection::new(mock).handle(&dispatcher).await.unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"*2\r\n$4\r\nINCR\r\n$1\r\nn\r\n".to_vec());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_append_closes_without_reply() {
        // Every write to /dev/full fails with ENOSPC
        let writer = Arc::new(AofWriter::new("/dev/full", SyncPolicy::No).unwrap());
        let dispatcher = Dispatcher::new().with_aof_writer(writer);

        let mock = Builder::new()
            .read(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
            .write(b"$-1\r\n")
            .read(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n")
            .build();

        let result = Connection::new(mock).handle(&dispatcher).await;
        assert!(matches!(result, Err(ConnectionError::Persistence(_))));
    }
}
