//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - NUL-terminated text)
//!
//! Every value is a UTF-8 text token followed by a single NUL byte. A token
//! carries at most 255 data bytes. One request is sent per TCP connection.
//!
//! ### Request Format
//! ```text
//! ┌─────────────┬─────────────┬──────────────────────────────┐
//! │ operation\0 │ timestamp\0 │ operation-specific tokens... │
//! └─────────────┴─────────────┴──────────────────────────────┘
//! ```
//!
//! ### Operations
//! - REGISTER:     user
//! - UNREGISTER:   user
//! - CONNECT:      user, port
//! - DISCONNECT:   user
//! - PUBLISH:      user, filename, description
//! - DELETE:       user, filename
//! - LIST_USERS:   user
//! - LIST_CONTENT: user, remote_user
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────────────────────────────────────────┐
//! │Status(1) │ body (LIST_USERS / LIST_CONTENT on OK only)  │
//! └──────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Status codes are scoped to the operation: the same byte means different
//! things for different operations (see [`response`]).
//!
//! LIST_USERS body: `count\0` then `name\0 address\0 port\0` per peer.
//! LIST_CONTENT body: `count\0` then `filename\0` per file.

mod command;
mod codec;
pub mod response;

pub use command::{Command, Operation, Request, NO_SESSION_USER};
pub use response::{
    ConnectStatus, DeleteStatus, DisconnectStatus, ListContentStatus, ListUsersStatus,
    PublishStatus, RegisterStatus, Response, UnregisterStatus,
};
pub use codec::{
    encode_request, encode_response, read_request, read_response, read_status, read_token,
    write_request, write_response, write_status, write_token, DecodeError, MAX_TOKEN_LEN,
};
