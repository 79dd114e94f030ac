//! # peerdir
//!
//! A centralized directory and presence server for a peer-to-peer
//! file-sharing overlay:
//! - Peers register an identity and announce where they listen
//! - Peers publish and withdraw file listings (metadata only)
//! - Anyone connected can ask who is online and what they share
//! - Every request is forwarded to an audit collector, fire-and-forget
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Acceptor                           │
//! │            (one detached thread per connection)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Connection                              │
//! │        (decode tokens → execute → encode status)            │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                 ┌───────────────┐
//!   │    Directory    │                 │   Audit Log   │
//!   │ (preconditions) │                 │   (channel)   │
//!   └────────┬────────┘                 └───────────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │    Registry     │
//!   │  (one Mutex)    │
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod registry;
pub mod protocol;
pub mod directory;
pub mod audit;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PeerdirError, Result};
pub use config::Config;
pub use directory::Directory;
pub use registry::Registry;
pub use client::{Client, Session};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of peerdir
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
