//! Audit sinks

use std::io::BufWriter;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{PeerdirError, Result};
use crate::protocol::write_token;

use super::{AuditRecord, AuditSink};

/// Logs audit records locally under the `audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        tracing::info!(
            target: "audit",
            "{} {} {}",
            record.user,
            record.operation,
            record.timestamp
        );
        Ok(())
    }
}

/// Sends each record to a remote collector over its own TCP connection
///
/// Wire format: `user\0 operation\0 timestamp\0`.
#[derive(Debug, Clone)]
pub struct TcpSink {
    addr: String,
    timeout: Duration,
}

impl TcpSink {
    pub fn new(addr: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_millis(timeout_ms.max(1)),
        }
    }

    fn open(&self) -> Result<TcpStream> {
        let mut last_err = None;
        for addr in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => e.into(),
            None => PeerdirError::Audit(format!("{} did not resolve", self.addr)),
        })
    }
}

impl AuditSink for TcpSink {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        let stream = self.open()?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut writer = BufWriter::new(stream);
        write_token(&mut writer, &record.user)?;
        write_token(&mut writer, &record.operation)?;
        write_token(&mut writer, &record.timestamp)?;
        writer.into_inner().map_err(|e| e.into_error())?;
        Ok(())
    }
}
