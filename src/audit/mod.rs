//! Audit Module
//!
//! Fire-and-forget forwarding of `(user, operation, timestamp)` records to
//! an audit collector.
//!
//! ## Architecture
//! - Connection handlers call [`AuditLog::notify`], which never blocks
//! - A bounded channel feeds one worker thread that owns the sink
//! - Sink failures are logged and dropped; they never reach a client

mod sink;

use std::thread;

use crossbeam::channel::{self, Sender, TrySendError};

use crate::config::Config;
use crate::error::Result;

pub use sink::{TcpSink, TracingSink};

/// One audited request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub user: String,
    pub operation: String,
    pub timestamp: String,
}

impl AuditRecord {
    pub fn new(
        user: impl Into<String>,
        operation: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            operation: operation.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Destination for audit records
pub trait AuditSink: Send {
    /// Deliver one record
    fn record(&mut self, record: &AuditRecord) -> Result<()>;
}

/// Channel senders act as in-process sinks
impl AuditSink for Sender<AuditRecord> {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        self.send(record.clone())
            .map_err(|e| crate::PeerdirError::Audit(format!("receiver gone: {}", e)))
    }
}

/// Handle used by connection handlers to emit audit records
#[derive(Clone, Debug)]
pub struct AuditLog {
    sender: Option<Sender<AuditRecord>>,
}

impl AuditLog {
    /// Start a worker thread that delivers records to `sink`
    ///
    /// At most `capacity` records wait for delivery; further records are
    /// dropped until the worker catches up.
    pub fn spawn<S: AuditSink + 'static>(mut sink: S, capacity: usize) -> Result<Self> {
        let (sender, receiver) = channel::bounded::<AuditRecord>(capacity.max(1));

        thread::Builder::new()
            .name("audit".to_string())
            .spawn(move || {
                for record in receiver {
                    if let Err(e) = sink.record(&record) {
                        tracing::warn!(
                            "Failed to deliver audit record for {} {}: {}",
                            record.user,
                            record.operation,
                            e
                        );
                    }
                }
                tracing::debug!("Audit worker stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
        })
    }

    /// Build the audit log described by the config
    ///
    /// A remote collector address selects [`TcpSink`]; otherwise records
    /// go to [`TracingSink`].
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        match &config.audit_addr {
            Some(addr) => Self::spawn(
                TcpSink::new(addr.clone(), config.audit_timeout_ms),
                config.audit_queue_capacity,
            ),
            None => Self::spawn(TracingSink, config.audit_queue_capacity),
        }
    }

    /// An audit log that discards everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Queue a record without blocking
    pub fn notify(&self, record: AuditRecord) {
        let Some(sender) = &self.sender else {
            return;
        };

        match sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::warn!(
                    "Audit queue full, dropping record for {} {}",
                    record.user,
                    record.operation
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Audit worker is gone, dropping record");
            }
        }
    }
}
