//! Registry Module
//!
//! The authoritative in-memory table of peers and the files they publish.
//!
//! ## Responsibilities
//! - Keep peer names unique across the directory
//! - Keep filenames unique within each peer
//! - Track connection state (address/port) per peer
//! - Serialize every lookup + mutation behind one registry-wide lock
//!
//! ## Data Structure Choice
//! Plain `Vec`s with linear scans: the expected population is small and
//! the order peers were inserted in is what LIST_USERS reports. Removal is
//! swap-with-last (`Vec::swap_remove`), so the relative order of the
//! remaining entries is NOT preserved across removals. Both tables start
//! at a configurable capacity and double when full; a failed growth is
//! reported as its own outcome rather than aborting the process.

mod peer;
mod table;

use std::collections::TryReserveError;
use std::net::IpAddr;

use parking_lot::{Mutex, MutexGuard};

use crate::config::Config;

pub use peer::{Peer, SharedFile};
pub use table::PeerTable;

/// Outcome of adding a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPeer {
    Created,
    AlreadyExists,
    ResizeFailed,
}

/// Outcome of removing a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovePeer {
    Removed,
    NotFound,
}

/// Outcome of publishing a file for a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddFile {
    Created,
    AlreadyPublished,
    ResizeFailed,
}

/// Outcome of withdrawing a file for a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveFile {
    Removed,
    NotFound,
}

/// A connected peer as reported by LIST_USERS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerListing {
    pub name: String,
    pub address: IpAddr,
    pub port: u16,
}

/// What was released by [`Registry::drain`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub peers: usize,
    pub files: usize,
}

/// Double `vec`'s capacity when it is full.
///
/// Allocation failure comes back as an error instead of aborting.
pub(crate) fn grow_if_full<T>(vec: &mut Vec<T>) -> std::result::Result<(), TryReserveError> {
    if vec.len() == vec.capacity() {
        vec.try_reserve_exact(vec.capacity().max(1))?;
    }
    Ok(())
}

/// Shared registry handle
///
/// ## Concurrency:
/// - `table`: one process-wide `Mutex`; every request takes it exactly once
///   for its whole critical section (lookup + mutation + snapshot copy)
/// - Network I/O never happens while the guard is held
pub struct Registry {
    table: Mutex<PeerTable>,
}

impl Registry {
    /// Create an empty registry with the default capacities
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Create an empty registry sized from the config
    pub fn from_config(config: &Config) -> Self {
        Self::with_capacity(config.initial_peer_capacity, config.initial_file_capacity)
    }

    /// Create an empty registry with explicit starting capacities
    pub fn with_capacity(peer_capacity: usize, file_capacity: usize) -> Self {
        Self {
            table: Mutex::new(PeerTable::with_capacity(peer_capacity, file_capacity)),
        }
    }

    /// Acquire the registry-wide lock
    ///
    /// The returned guard is the only access path to the peer table.
    pub fn lock(&self) -> MutexGuard<'_, PeerTable> {
        self.table.lock()
    }

    /// Number of registered peers
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every peer and its file storage (shutdown drain phase)
    pub fn drain(&self) -> DrainStats {
        let mut table = self.table.lock();
        table.clear()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
