//! Configuration for peerdir
//!
//! Centralized configuration with sensible defaults.

use crate::error::{PeerdirError, Result};

/// Main configuration for a peerdir server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (all interfaces by default)
    pub listen_addr: String,

    // -------------------------------------------------------------------------
    // Registry Configuration
    // -------------------------------------------------------------------------
    /// Starting capacity of the peer table (doubles on overflow)
    pub initial_peer_capacity: usize,

    /// Starting capacity of each peer's file table (doubles on overflow)
    pub initial_file_capacity: usize,

    // -------------------------------------------------------------------------
    // Audit Configuration
    // -------------------------------------------------------------------------
    /// Remote audit collector (host:port). `None` logs audit records locally.
    pub audit_addr: Option<String>,

    /// Max audit records waiting for delivery before new ones are dropped
    pub audit_queue_capacity: usize,

    /// Connect/write timeout for the remote audit collector (milliseconds)
    pub audit_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8888".to_string(),
            initial_peer_capacity: 100,
            initial_file_capacity: 10,
            audit_addr: None,
            audit_queue_capacity: 1024,
            audit_timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings the server cannot run with
    ///
    /// Zero table capacities are allowed; the tables grow on first insert.
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(PeerdirError::Config("listen address is empty".to_string()));
        }
        if self.audit_queue_capacity == 0 {
            return Err(PeerdirError::Config(
                "audit queue capacity must be at least 1".to_string(),
            ));
        }
        if let Some(addr) = &self.audit_addr {
            if addr.trim().is_empty() {
                return Err(PeerdirError::Config(
                    "audit collector address is empty".to_string(),
                ));
            }
            if self.audit_timeout_ms == 0 {
                return Err(PeerdirError::Config(
                    "audit collector timeout must be non-zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the starting capacity of the peer table
    pub fn initial_peer_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_peer_capacity = capacity;
        self
    }

    /// Set the starting capacity of each peer's file table
    pub fn initial_file_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_file_capacity = capacity;
        self
    }

    /// Set the remote audit collector address
    pub fn audit_addr(mut self, addr: Option<String>) -> Self {
        self.config.audit_addr = addr;
        self
    }

    /// Set the audit queue capacity
    pub fn audit_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.audit_queue_capacity = capacity;
        self
    }

    /// Set the audit collector timeout (in milliseconds)
    pub fn audit_timeout_ms(mut self, ms: u64) -> Self {
        self.config.audit_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
