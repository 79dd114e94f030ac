//! Directory Module
//!
//! Executes decoded commands against the registry.
//!
//! ## Responsibilities
//! - Check each operation's preconditions (user known, connection state)
//! - Apply the mutation or take the snapshot in the same critical section
//! - Map the outcome to the operation's own status code
//!
//! The registry lock is taken once per command and released before the
//! response is written, so slow clients never hold up other connections.

use std::net::IpAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::protocol::{
    Command, ConnectStatus, DeleteStatus, DisconnectStatus, ListContentStatus, ListUsersStatus,
    PublishStatus, RegisterStatus, Response, UnregisterStatus, NO_SESSION_USER,
};
use crate::registry::{AddFile, AddPeer, DrainStats, PeerTable, Registry, RemoveFile, RemovePeer};

/// The directory service
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Directory {
    registry: Arc<Registry>,
}

impl Directory {
    /// Create a directory over an empty registry sized from the config
    pub fn new(config: &Config) -> Self {
        Self::with_registry(Arc::new(Registry::from_config(config)))
    }

    /// Create a directory over an existing registry
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Execute a command
    ///
    /// `origin` is the address of the connection the command arrived on; it
    /// becomes the peer's advertised address on CONNECT.
    pub fn execute(&self, command: &Command, origin: IpAddr) -> Response {
        match command {
            Command::Register { user } => Response::Register(self.register(user)),
            Command::Unregister { user } => Response::Unregister(self.unregister(user)),
            Command::Connect { user, port } => {
                Response::Connect(self.connect(user, origin, *port))
            }
            Command::Disconnect { user } => Response::Disconnect(self.disconnect(user)),
            Command::Publish {
                user,
                filename,
                description,
            } => Response::Publish(self.publish(user, filename, description)),
            Command::Delete { user, filename } => Response::Delete(self.delete(user, filename)),
            Command::ListUsers { user } => self.list_users(user),
            Command::ListContent { user, remote_user } => self.list_content(user, remote_user),
        }
    }

    /// Register a new peer
    pub fn register(&self, user: &str) -> RegisterStatus {
        match self.registry.lock().add_peer(user) {
            AddPeer::Created => RegisterStatus::Ok,
            AddPeer::AlreadyExists => RegisterStatus::UserExists,
            AddPeer::ResizeFailed => RegisterStatus::InternalError,
        }
    }

    /// Remove a peer and everything it published
    pub fn unregister(&self, user: &str) -> UnregisterStatus {
        match self.registry.lock().remove_peer(user) {
            RemovePeer::Removed => UnregisterStatus::Ok,
            RemovePeer::NotFound => UnregisterStatus::UnknownUser,
        }
    }

    /// Mark a peer online at `address:port`
    pub fn connect(&self, user: &str, address: IpAddr, port: u16) -> ConnectStatus {
        let mut table = self.registry.lock();
        let Some(index) = table.find_peer(user) else {
            return ConnectStatus::UnknownUser;
        };
        if table.peer(index).is_connected() {
            return ConnectStatus::AlreadyConnected;
        }
        table.set_connected(index, address, port);
        ConnectStatus::Ok
    }

    /// Mark a peer offline
    pub fn disconnect(&self, user: &str) -> DisconnectStatus {
        let mut table = self.registry.lock();
        let Some(index) = table.find_peer(user) else {
            return DisconnectStatus::UnknownUser;
        };
        if !table.peer(index).is_connected() {
            return DisconnectStatus::NotConnected;
        }
        table.set_disconnected(index);
        DisconnectStatus::Ok
    }

    /// Publish file metadata for a connected peer
    pub fn publish(&self, user: &str, filename: &str, description: &str) -> PublishStatus {
        if user == NO_SESSION_USER {
            return PublishStatus::UnknownUser;
        }

        let mut table = self.registry.lock();
        let index = match connected_index(&table, user) {
            Ok(index) => index,
            Err(Precondition::UnknownUser) => return PublishStatus::UnknownUser,
            Err(Precondition::NotConnected) => return PublishStatus::NotConnected,
        };

        match table.add_file(index, filename, description) {
            AddFile::Created => PublishStatus::Ok,
            AddFile::AlreadyPublished => PublishStatus::AlreadyPublished,
            AddFile::ResizeFailed => PublishStatus::InternalError,
        }
    }

    /// Withdraw a file for a connected peer
    pub fn delete(&self, user: &str, filename: &str) -> DeleteStatus {
        if user == NO_SESSION_USER {
            return DeleteStatus::UnknownUser;
        }

        let mut table = self.registry.lock();
        let index = match connected_index(&table, user) {
            Ok(index) => index,
            Err(Precondition::UnknownUser) => return DeleteStatus::UnknownUser,
            Err(Precondition::NotConnected) => return DeleteStatus::NotConnected,
        };

        match table.remove_file(index, filename) {
            RemoveFile::Removed => DeleteStatus::Ok,
            RemoveFile::NotFound => DeleteStatus::NotPublished,
        }
    }

    /// Snapshot the connected peers on behalf of a connected peer
    pub fn list_users(&self, user: &str) -> Response {
        if user == NO_SESSION_USER {
            return Response::list_users_failed(ListUsersStatus::UnknownUser);
        }

        let table = self.registry.lock();
        match connected_index(&table, user) {
            Ok(_) => Response::ListUsers {
                status: ListUsersStatus::Ok,
                peers: table.snapshot_connected_peers(),
            },
            Err(Precondition::UnknownUser) => {
                Response::list_users_failed(ListUsersStatus::UnknownUser)
            }
            Err(Precondition::NotConnected) => {
                Response::list_users_failed(ListUsersStatus::NotConnected)
            }
        }
    }

    /// Snapshot another peer's filenames on behalf of a connected peer
    ///
    /// The remote peer does not have to be connected.
    pub fn list_content(&self, user: &str, remote_user: &str) -> Response {
        if user == NO_SESSION_USER {
            return Response::list_content_failed(ListContentStatus::UnknownUser);
        }

        let table = self.registry.lock();
        if let Err(failed) = connected_index(&table, user) {
            let status = match failed {
                Precondition::UnknownUser => ListContentStatus::UnknownUser,
                Precondition::NotConnected => ListContentStatus::NotConnected,
            };
            return Response::list_content_failed(status);
        }

        match table.find_peer(remote_user) {
            Some(remote) => Response::ListContent {
                status: ListContentStatus::Ok,
                files: table.snapshot_files(remote),
            },
            None => Response::list_content_failed(ListContentStatus::UnknownRemoteUser),
        }
    }

    /// Release all registry state (shutdown drain phase)
    pub fn drain(&self) -> DrainStats {
        self.registry.drain()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the shared registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Number of registered peers
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }
}

/// Why a requesting user cannot act
enum Precondition {
    UnknownUser,
    NotConnected,
}

/// Index of `user`, which must exist and be connected
fn connected_index(table: &PeerTable, user: &str) -> Result<usize, Precondition> {
    let index = table.find_peer(user).ok_or(Precondition::UnknownUser)?;
    if !table.peer(index).is_connected() {
        return Err(Precondition::NotConnected);
    }
    Ok(index)
}
