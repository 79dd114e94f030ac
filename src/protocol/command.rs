//! Request definitions
//!
//! Represents requests from clients.

use std::fmt;
use std::str::FromStr;

use crate::error::PeerdirError;

/// Username a client sends when it has no active session.
///
/// PUBLISH, DELETE, LIST_USERS and LIST_CONTENT always reject it with
/// status 1, before any registry lookup.
pub const NO_SESSION_USER: &str = "__NONE__";

/// Operation names as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Unregister,
    Connect,
    Disconnect,
    Publish,
    Delete,
    ListUsers,
    ListContent,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Register,
        Operation::Unregister,
        Operation::Connect,
        Operation::Disconnect,
        Operation::Publish,
        Operation::Delete,
        Operation::ListUsers,
        Operation::ListContent,
    ];

    /// Wire token for this operation
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Register => "REGISTER",
            Operation::Unregister => "UNREGISTER",
            Operation::Connect => "CONNECT",
            Operation::Disconnect => "DISCONNECT",
            Operation::Publish => "PUBLISH",
            Operation::Delete => "DELETE",
            Operation::ListUsers => "LIST_USERS",
            Operation::ListContent => "LIST_CONTENT",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = PeerdirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| PeerdirError::UnknownOperation(s.to_string()))
    }
}

/// A decoded command with its operation-specific fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a peer identity
    Register { user: String },

    /// Remove a peer identity and its files
    Unregister { user: String },

    /// Announce the port the peer listens on; the address comes from the socket
    Connect { user: String, port: u16 },

    /// Mark the peer offline
    Disconnect { user: String },

    /// Publish file metadata
    Publish {
        user: String,
        filename: String,
        description: String,
    },

    /// Withdraw a published file
    Delete { user: String, filename: String },

    /// List connected peers
    ListUsers { user: String },

    /// List the files of another peer
    ListContent { user: String, remote_user: String },
}

impl Command {
    /// Get the operation
    pub fn operation(&self) -> Operation {
        match self {
            Command::Register { .. } => Operation::Register,
            Command::Unregister { .. } => Operation::Unregister,
            Command::Connect { .. } => Operation::Connect,
            Command::Disconnect { .. } => Operation::Disconnect,
            Command::Publish { .. } => Operation::Publish,
            Command::Delete { .. } => Operation::Delete,
            Command::ListUsers { .. } => Operation::ListUsers,
            Command::ListContent { .. } => Operation::ListContent,
        }
    }

    /// The requesting user
    pub fn user(&self) -> &str {
        match self {
            Command::Register { user }
            | Command::Unregister { user }
            | Command::Connect { user, .. }
            | Command::Disconnect { user }
            | Command::Publish { user, .. }
            | Command::Delete { user, .. }
            | Command::ListUsers { user }
            | Command::ListContent { user, .. } => user,
        }
    }
}

/// A full request: client timestamp plus command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Free-form client timestamp, forwarded to the audit log untouched
    pub timestamp: String,

    pub command: Command,
}

impl Request {
    pub fn new(timestamp: impl Into<String>, command: Command) -> Self {
        Self {
            timestamp: timestamp.into(),
            command,
        }
    }

    pub fn operation(&self) -> Operation {
        self.command.operation()
    }

    pub fn user(&self) -> &str {
        self.command.user()
    }
}
