//! Response definitions
//!
//! Status codes are scoped to the operation that produced them. Code 1 is
//! "user exists" for REGISTER but "unknown user" everywhere else, and so on.
//! Each operation therefore has its own status enum.

use crate::error::{PeerdirError, Result};
use crate::registry::PeerListing;

use super::Operation;

macro_rules! status_codes {
    (
        $(#[$meta:meta])*
        $name:ident, $op:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code ),+
        }

        impl $name {
            /// Wire byte
            pub fn code(self) -> u8 {
                self as u8
            }

            /// Parse a wire byte
            pub fn from_code(code: u8) -> Result<Self> {
                match code {
                    $( $code => Ok(Self::$variant), )+
                    _ => Err(PeerdirError::UnknownStatus { operation: $op, code }),
                }
            }

            pub fn is_ok(self) -> bool {
                self.code() == 0
            }
        }

        impl From<$name> for u8 {
            fn from(status: $name) -> u8 {
                status.code()
            }
        }
    };
}

status_codes! {
    /// REGISTER status
    RegisterStatus, "REGISTER" {
        Ok = 0,
        UserExists = 1,
        /// The peer table could not grow
        InternalError = 4,
    }
}

status_codes! {
    /// UNREGISTER status
    UnregisterStatus, "UNREGISTER" {
        Ok = 0,
        UnknownUser = 1,
    }
}

status_codes! {
    /// CONNECT status
    ConnectStatus, "CONNECT" {
        Ok = 0,
        UnknownUser = 1,
        AlreadyConnected = 2,
    }
}

status_codes! {
    /// DISCONNECT status
    DisconnectStatus, "DISCONNECT" {
        Ok = 0,
        UnknownUser = 1,
        NotConnected = 2,
    }
}

status_codes! {
    /// PUBLISH status
    PublishStatus, "PUBLISH" {
        Ok = 0,
        /// Unknown user, or the no-session sentinel
        UnknownUser = 1,
        NotConnected = 2,
        AlreadyPublished = 3,
        /// Storage growth failure or malformed request
        InternalError = 4,
    }
}

status_codes! {
    /// DELETE status
    DeleteStatus, "DELETE" {
        Ok = 0,
        /// Unknown user, or the no-session sentinel
        UnknownUser = 1,
        NotConnected = 2,
        NotPublished = 3,
        /// Malformed request
        InternalError = 4,
    }
}

status_codes! {
    /// LIST_USERS status
    ListUsersStatus, "LIST_USERS" {
        Ok = 0,
        UnknownUser = 1,
        NotConnected = 2,
    }
}

status_codes! {
    /// LIST_CONTENT status
    ListContentStatus, "LIST_CONTENT" {
        Ok = 0,
        UnknownUser = 1,
        NotConnected = 2,
        UnknownRemoteUser = 3,
    }
}

/// A response to send to the client
///
/// List bodies are only sent when the status is OK; for any other status
/// they are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Register(RegisterStatus),
    Unregister(UnregisterStatus),
    Connect(ConnectStatus),
    Disconnect(DisconnectStatus),
    Publish(PublishStatus),
    Delete(DeleteStatus),
    ListUsers {
        status: ListUsersStatus,
        peers: Vec<PeerListing>,
    },
    ListContent {
        status: ListContentStatus,
        files: Vec<String>,
    },
}

impl Response {
    /// Operation this response answers
    pub fn operation(&self) -> Operation {
        match self {
            Response::Register(_) => Operation::Register,
            Response::Unregister(_) => Operation::Unregister,
            Response::Connect(_) => Operation::Connect,
            Response::Disconnect(_) => Operation::Disconnect,
            Response::Publish(_) => Operation::Publish,
            Response::Delete(_) => Operation::Delete,
            Response::ListUsers { .. } => Operation::ListUsers,
            Response::ListContent { .. } => Operation::ListContent,
        }
    }

    /// Wire status byte
    pub fn status_code(&self) -> u8 {
        match self {
            Response::Register(s) => s.code(),
            Response::Unregister(s) => s.code(),
            Response::Connect(s) => s.code(),
            Response::Disconnect(s) => s.code(),
            Response::Publish(s) => s.code(),
            Response::Delete(s) => s.code(),
            Response::ListUsers { status, .. } => status.code(),
            Response::ListContent { status, .. } => status.code(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code() == 0
    }

    /// LIST_USERS failure (no body)
    pub fn list_users_failed(status: ListUsersStatus) -> Self {
        Response::ListUsers {
            status,
            peers: Vec::new(),
        }
    }

    /// LIST_CONTENT failure (no body)
    pub fn list_content_failed(status: ListContentStatus) -> Self {
        Response::ListContent {
            status,
            files: Vec::new(),
        }
    }

    /// Status to send when the request for `operation` could not be read
    /// completely.
    ///
    /// Only PUBLISH and DELETE answer a malformed request; every other
    /// operation closes the connection silently.
    pub fn malformed(operation: Operation) -> Option<Self> {
        match operation {
            Operation::Publish => Some(Response::Publish(PublishStatus::InternalError)),
            Operation::Delete => Some(Response::Delete(DeleteStatus::InternalError)),
            _ => None,
        }
    }
}
