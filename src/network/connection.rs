//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};

use crate::audit::{AuditLog, AuditRecord};
use crate::directory::Directory;
use crate::error::{PeerdirError, Result};
use crate::protocol::{read_request, write_response, DecodeError, Response};

/// Handles a single client connection
///
/// A connection carries exactly one request. Reads block with no timeout.
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Directory the request is executed against
    directory: Directory,

    /// Audit log handle
    audit: AuditLog,

    /// Peer address, also the advertised address on CONNECT
    peer_addr: SocketAddr,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, directory: Directory, audit: AuditLog) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            directory,
            audit,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until the exchange completes)
    ///
    /// The connection is closed when `self` is dropped.
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let request = match read_request(&mut self.reader) {
            Ok(request) => request,
            Err(e) => return self.reject(e),
        };

        tracing::info!(
            timestamp = %request.timestamp,
            "OPERATION {} FROM {}",
            request.operation(),
            request.user()
        );

        let response = self.directory.execute(&request.command, self.peer_addr.ip());

        self.audit.notify(AuditRecord::new(
            request.user(),
            request.operation().as_str(),
            request.timestamp.as_str(),
        ));

        tracing::debug!(
            "{} for {} -> status {}",
            request.operation(),
            self.peer_addr,
            response.status_code()
        );

        self.send_response(&response)
    }

    /// Deal with a request that could not be decoded
    fn reject(&mut self, error: DecodeError) -> Result<()> {
        match &error.source {
            PeerdirError::UnknownOperation(op) => {
                tracing::warn!("Unknown operation {:?} from {}", op, self.peer_addr);
                return Ok(());
            }
            e if e.is_disconnect() => {
                tracing::debug!("Client {} closed mid-request: {}", self.peer_addr, e);
            }
            e => {
                tracing::warn!("Malformed request from {}: {}", self.peer_addr, e);
            }
        }

        // Answer when the client would otherwise be left waiting
        if let Some(response) = error.operation.and_then(Response::malformed) {
            if let Err(e) = self.send_response(&response) {
                tracing::debug!("Could not report malformed request to {}: {}", self.peer_addr, e);
            }
        }

        if error.source.is_disconnect() {
            Ok(())
        } else {
            Err(error.source)
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        match write_response(&mut self.writer, response) {
            Ok(()) => Ok(()),
            Err(e) if e.is_disconnect() => {
                // Client left before reading the answer
                tracing::debug!(
                    "Client {} disconnected before response could be sent: {}",
                    self.peer_addr,
                    e
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                Err(e)
            }
        }
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
