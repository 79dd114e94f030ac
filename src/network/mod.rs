//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop
//! - One detached thread per accepted connection, no upper bound
//! - One request/response exchange per connection
//! - Commands routed through [`Directory`](crate::directory::Directory)

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
