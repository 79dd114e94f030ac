//! Peer table
//!
//! Index-based lookup and mutation. Callers reach it only through
//! [`Registry::lock`](super::Registry::lock), so every method here runs
//! with the registry-wide lock held.
//!
//! Indices returned by [`PeerTable::find_peer`] are valid until the next
//! peer removal under the same guard.

use std::net::IpAddr;

use super::{grow_if_full, AddFile, AddPeer, DrainStats, Peer, PeerListing, RemoveFile, RemovePeer};

/// The table of registered peers
#[derive(Debug)]
pub struct PeerTable {
    peers: Vec<Peer>,

    /// Starting capacity for each new peer's file table
    file_capacity: usize,
}

impl PeerTable {
    /// Create an empty table
    pub fn with_capacity(peer_capacity: usize, file_capacity: usize) -> Self {
        Self {
            peers: Vec::with_capacity(peer_capacity),
            file_capacity,
        }
    }

    /// Find a peer by exact (case-sensitive) name
    pub fn find_peer(&self, name: &str) -> Option<usize> {
        self.peers.iter().position(|p| p.name() == name)
    }

    /// Register a new, disconnected peer
    pub fn add_peer(&mut self, name: &str) -> AddPeer {
        if self.find_peer(name).is_some() {
            return AddPeer::AlreadyExists;
        }

        if let Err(e) = grow_if_full(&mut self.peers) {
            tracing::error!("Failed to grow peer table: {}", e);
            return AddPeer::ResizeFailed;
        }

        let mut files = Vec::new();
        if let Err(e) = files.try_reserve_exact(self.file_capacity) {
            tracing::error!("Failed to allocate file table for {}: {}", name, e);
            return AddPeer::ResizeFailed;
        }

        self.peers.push(Peer::new(name.to_string(), files));
        AddPeer::Created
    }

    /// Remove a peer and release its files (swap-with-last)
    pub fn remove_peer(&mut self, name: &str) -> RemovePeer {
        match self.find_peer(name) {
            Some(index) => {
                self.peers.swap_remove(index);
                RemovePeer::Removed
            }
            None => RemovePeer::NotFound,
        }
    }

    /// Mark a peer connected at `address:port`
    ///
    /// Unconditional: the caller checks the current state first.
    pub fn set_connected(&mut self, index: usize, address: IpAddr, port: u16) {
        self.peers[index].set_connected(address, port);
    }

    /// Mark a peer disconnected (unconditional)
    pub fn set_disconnected(&mut self, index: usize) {
        self.peers[index].set_disconnected();
    }

    /// Publish a file for the peer at `index`
    pub fn add_file(&mut self, index: usize, filename: &str, description: &str) -> AddFile {
        self.peers[index].add_file(filename, description)
    }

    /// Withdraw a file for the peer at `index` (swap-with-last)
    pub fn remove_file(&mut self, index: usize, filename: &str) -> RemoveFile {
        self.peers[index].remove_file(filename)
    }

    /// Copy out every connected peer, in table order
    pub fn snapshot_connected_peers(&self) -> Vec<PeerListing> {
        self.peers
            .iter()
            .filter_map(|p| {
                p.endpoint().map(|(address, port)| PeerListing {
                    name: p.name().to_string(),
                    address,
                    port,
                })
            })
            .collect()
    }

    /// Copy out the filenames of the peer at `index`, in table order
    pub fn snapshot_files(&self, index: usize) -> Vec<String> {
        self.peers[index]
            .files()
            .iter()
            .map(|f| f.filename.clone())
            .collect()
    }

    /// Peer at `index`
    pub fn peer(&self, index: usize) -> &Peer {
        &self.peers[index]
    }

    /// Iterate peers in table order
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Current capacity of the peer table
    pub fn capacity(&self) -> usize {
        self.peers.capacity()
    }

    /// Drop every peer and its file storage
    pub(crate) fn clear(&mut self) -> DrainStats {
        let stats = DrainStats {
            peers: self.peers.len(),
            files: self.peers.iter().map(|p| p.files().len()).sum(),
        };
        self.peers = Vec::new();
        stats
    }
}
