//! Error types for peerdir
//!
//! Provides a unified error type for all operations.

use std::io::ErrorKind;

use thiserror::Error;

/// Result type alias using PeerdirError
pub type Result<T> = std::result::Result<T, PeerdirError>;

/// Unified error type for peerdir operations
#[derive(Debug, Error)]
pub enum PeerdirError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Token exceeds {limit} bytes")]
    TokenTooLong { limit: usize },

    #[error("Empty {0} token")]
    EmptyToken(&'static str),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Unknown {operation} status code: {code}")]
    UnknownStatus { operation: &'static str, code: u8 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Audit Errors
    // -------------------------------------------------------------------------
    #[error("Audit error: {0}")]
    Audit(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PeerdirError {
    /// True when the error means the remote side went away mid-exchange
    pub fn is_disconnect(&self) -> bool {
        match self {
            PeerdirError::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
