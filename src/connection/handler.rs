//! Connection Handler Module
//!
//! Each client gets its own handler task that loops reading requests and
//! writing replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. ┌────────────────────────────────────┐
//!    │            Main Loop               │
//!    │                                    │
//!    │  parse buffered bytes ──┐          │
//!    │     │ complete          │ partial  │
//!    │     ▼                   ▼          │
//!    │  execute + reply    read more      │
//!    │     │               (timed out if  │
//!    │     │                a request is  │
//!    │     │                half-sent)    │
//!    │     └──────[loop back]─────┘       │
//!    └────────────────────────────────────┘
//!        │
//!        ▼
//! 3. Client disconnects / I/O error, task ends
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut`. A request may arrive over
//! several reads, and one read may carry several requests; each complete
//! request is answered in order.
//!
//! Bytes that can never form a request are thrown away and answered with
//! `-ERR unknown command`. The same happens to a partial request that sees
//! no new bytes within [`ConnectionConfig::partial_request_timeout`] and to
//! a buffer that grows past [`ConnectionConfig::max_request_size`]. In each
//! case the connection stays open and the rejected request gets exactly one
//! reply: whatever is left of it on the wire is dropped silently until the
//! next request parses or the client pauses.

use crate::commands::{CommandError, CommandHandler};
use crate::protocol::types::prefix;
use crate::protocol::{Request, RespParser, RespValue};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Default wait for the rest of a partially received request
pub const DEFAULT_PARTIAL_REQUEST_TIMEOUT: Duration = Duration::from_millis(250);

/// Default cap on buffered bytes for a single request (8 MB)
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// How long a half-received request may sit idle before it is rejected
    pub partial_request_timeout: Duration,
    /// Largest request the connection will buffer
    pub max_request_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            partial_request_timeout: DEFAULT_PARTIAL_REQUEST_TIMEOUT,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }
}

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests executed
    pub commands_processed: AtomicU64,
    /// Requests thrown away as malformed, truncated or oversized
    pub requests_rejected: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Why buffered bytes were thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Malformed,
    Truncated,
    Oversized,
}

/// Handles a single client connection.
///
/// Generic over the stream so the loop can be driven by a `TcpStream` or
/// by an in-memory mock.
pub struct ConnectionHandler<S> {
    /// The client stream, buffered for writes
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared store)
    command_handler: CommandHandler,

    parser: RespParser,

    config: ConnectionConfig,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Set after a rejection until the stream is back at a request boundary
    resyncing: bool,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        config: ConnectionConfig,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RespParser::new().with_max_bulk_size(config.max_request_size),
            config,
            stats,
            resyncing: false,
        }
    }

    /// Runs the connection until the client goes away or an I/O error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::Io(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(request) = self.try_parse_request().await? {
                let response = self.command_handler.execute(&request);
                self.stats.command_processed();
                self.send_response(&response).await?;
            }

            if self.buffer.len() > self.config.max_request_size {
                self.reject(Rejection::Oversized).await?;
                continue;
            }

            self.read_more_data().await?;
        }
    }

    /// Attempts to parse a request from the buffer.
    ///
    /// Unparseable bytes are rejected here and parsing resumes at the next
    /// plausible request start. While resyncing after a rejection, bytes
    /// that still do not parse are dropped without a reply.
    async fn try_parse_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        loop {
            match self.parser.parse(&self.buffer) {
                Ok(Some((request, consumed))) => {
                    self.buffer.advance(consumed);
                    self.resyncing = false;
                    trace!(
                        client = %self.addr,
                        consumed = consumed,
                        remaining = self.buffer.len(),
                        "Parsed request"
                    );
                    return Ok(Some(request));
                }
                Ok(None) => {
                    if !self.buffer.is_empty() {
                        trace!(
                            client = %self.addr,
                            buffered = self.buffer.len(),
                            "Incomplete request, need more data"
                        );
                    }
                    return Ok(None);
                }
                Err(_) if self.resyncing => {
                    let skip = resync_skip(&self.buffer);
                    trace!(client = %self.addr, skipped = skip, "Dropping leftover bytes");
                    self.buffer.advance(skip);
                    if skip == 0 {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "Parse error");
                    self.reject(Rejection::Malformed).await?;
                }
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    ///
    /// With part of a request already buffered, or while resyncing, the read
    /// is bounded by the partial request timeout.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = if self.buffer.is_empty() && !self.resyncing {
            self.stream.get_mut().read_buf(&mut self.buffer).await?
        } else {
            let read = self.stream.get_mut().read_buf(&mut self.buffer);
            match tokio::time::timeout(self.config.partial_request_timeout, read).await {
                Ok(n) => n?,
                Err(_) if self.resyncing => {
                    trace!(client = %self.addr, dropped = self.buffer.len(), "Resync finished");
                    self.buffer.clear();
                    self.resyncing = false;
                    return Ok(());
                }
                Err(_) => {
                    return self.reject(Rejection::Truncated).await;
                }
            }
        };

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            }
            if !self.resyncing {
                // The client half-closed mid-request; it may still read the reply
                let _ = self.reject(Rejection::Truncated).await;
            }
            return Err(ConnectionError::UnexpectedEof);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Throws away the rejected bytes and tells the client its request was
    /// not understood.
    ///
    /// The rest of a rejected request may still be in flight, so the
    /// connection then resyncs: leftover bytes are dropped silently until
    /// a request parses or the stream goes quiet.
    async fn reject(&mut self, reason: Rejection) -> Result<(), ConnectionError> {
        let discard = match reason {
            Rejection::Malformed => resync_skip(&self.buffer),
            Rejection::Truncated | Rejection::Oversized => self.buffer.len(),
        };
        debug!(
            client = %self.addr,
            reason = ?reason,
            discarded = discard,
            "Rejecting request"
        );
        self.buffer.advance(discard);
        self.resyncing = true;
        self.stats.request_rejected();
        self.send_response(&CommandError::UnknownCommand.into_reply())
            .await
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            reply = %response,
            "Sent response"
        );
        Ok(())
    }
}

/// Number of leading bytes to drop to reach the next `*` that starts a line.
///
/// A trailing `\n` is kept, since the next read may begin with `*`.
fn resync_skip(buf: &[u8]) -> usize {
    match (1..buf.len()).find(|&i| buf[i] == prefix::ARRAY && buf[i - 1] == b'\n') {
        Some(i) => i,
        None if buf.ends_with(b"\n") => buf.len() - 1,
        None => buf.len(),
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// The stream ended in the middle of a request
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Handles a client connection to completion.
///
/// Errors are logged here and never reach the accept loop.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    config: ConnectionConfig,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, config, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
