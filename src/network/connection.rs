//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{KvsError, Result};
use crate::protocol::{read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Engine that executes commands
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true).map_err(KvsError::Network)?;

        let read_stream = stream.try_clone().map_err(KvsError::Network)?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a direction without timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let to_duration = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));

        self.reader
            .get_ref()
            .set_read_timeout(to_duration(read_ms))
            .map_err(KvsError::Network)?;
        self.writer
            .get_ref()
            .set_write_timeout(to_duration(write_ms))
            .map_err(KvsError::Network)?;

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(KvsError::Network(ref e)) if is_disconnect(e) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = write_response(&mut self.writer, &Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let response = self.execute_command(command);

            if let Err(e) = write_response(&mut self.writer, &response) {
                if let KvsError::Network(ref io_err) = e {
                    if is_disconnect(io_err) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a command and turn its outcome into a response.
    ///
    /// This is where storage errors become user-facing messages.
    fn execute_command(&self, command: Command) -> Response {
        let command_type = command.command_type();
        match self.engine.execute(command) {
            Ok(payload) => Response::ok(payload),
            Err(e) => {
                tracing::debug!("{:?} from {} failed: {}", command_type, self.peer_addr, e);
                Response::error(&e.to_string())
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Errors that just mean the peer went away (or idled past the timeout)
fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
