//! Peer and published file records

use std::net::{IpAddr, Ipv4Addr};

use super::{grow_if_full, AddFile, RemoveFile};

/// File metadata published by a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    pub filename: String,
    pub description: String,
}

/// A registered identity in the directory
#[derive(Debug, Clone)]
pub struct Peer {
    name: String,
    connected: bool,
    address: IpAddr,
    port: u16,
    files: Vec<SharedFile>,
}

impl Peer {
    /// Create a disconnected peer with pre-allocated file storage
    pub(crate) fn new(name: String, files: Vec<SharedFile>) -> Self {
        Self {
            name,
            connected: false,
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            files,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Address and port, only while connected
    ///
    /// Values from an earlier session linger after DISCONNECT but are
    /// never reported.
    pub fn endpoint(&self) -> Option<(IpAddr, u16)> {
        self.connected.then_some((self.address, self.port))
    }

    /// Published files, in table order
    pub fn files(&self) -> &[SharedFile] {
        &self.files
    }

    /// Current capacity of the file table
    pub fn file_capacity(&self) -> usize {
        self.files.capacity()
    }

    pub(crate) fn set_connected(&mut self, address: IpAddr, port: u16) {
        self.connected = true;
        self.address = address;
        self.port = port;
    }

    pub(crate) fn set_disconnected(&mut self) {
        self.connected = false;
    }

    pub(crate) fn add_file(&mut self, filename: &str, description: &str) -> AddFile {
        // A duplicate is reported even if growing would also have failed
        if self.files.iter().any(|f| f.filename == filename) {
            return AddFile::AlreadyPublished;
        }

        if let Err(e) = grow_if_full(&mut self.files) {
            tracing::error!("Failed to grow file table of {}: {}", self.name, e);
            return AddFile::ResizeFailed;
        }

        self.files.push(SharedFile {
            filename: filename.to_string(),
            description: description.to_string(),
        });
        AddFile::Created
    }

    pub(crate) fn remove_file(&mut self, filename: &str) -> RemoveFile {
        match self.files.iter().position(|f| f.filename == filename) {
            Some(index) => {
                self.files.swap_remove(index);
                RemoveFile::Removed
            }
            None => RemoveFile::NotFound,
        }
    }
}
