//! Blocking protocol client
//!
//! Opens one TCP connection per request, the way the server expects.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};

use chrono::Local;

use crate::error::Result;
use crate::protocol::{
    read_response, write_request, Command, ConnectStatus, DeleteStatus, DisconnectStatus,
    ListContentStatus, ListUsersStatus, PublishStatus, RegisterStatus, Request, Response,
    UnregisterStatus, NO_SESSION_USER,
};
use crate::registry::PeerListing;

/// Timestamp format sent with every request
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Client for a peerdir server
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
}

impl Client {
    /// Create a client for the server at `addr` (host:port)
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Server address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Current local time in the wire timestamp format
    pub fn timestamp() -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// Send one request and wait for its response
    pub fn send(&self, request: &Request) -> Result<Response> {
        let stream = TcpStream::connect(&self.addr)?;
        stream.set_nodelay(true)?;

        let mut writer = BufWriter::new(stream.try_clone()?);
        write_request(&mut writer, request)?;
        drop(writer);

        let mut reader = BufReader::new(stream);
        let response = read_response(&mut reader, request.operation())?;

        let _ = reader.get_ref().shutdown(Shutdown::Both);
        Ok(response)
    }

    fn execute(&self, command: Command) -> Result<Response> {
        self.send(&Request::new(Self::timestamp(), command))
    }

    pub fn register(&self, user: &str) -> Result<RegisterStatus> {
        match self.execute(Command::Register { user: user.to_string() })? {
            Response::Register(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub fn unregister(&self, user: &str) -> Result<UnregisterStatus> {
        match self.execute(Command::Unregister { user: user.to_string() })? {
            Response::Unregister(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    /// Announce that `user` accepts peer connections on `port`
    pub fn connect(&self, user: &str, port: u16) -> Result<ConnectStatus> {
        match self.execute(Command::Connect {
            user: user.to_string(),
            port,
        })? {
            Response::Connect(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub fn disconnect(&self, user: &str) -> Result<DisconnectStatus> {
        match self.execute(Command::Disconnect { user: user.to_string() })? {
            Response::Disconnect(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub fn publish(&self, user: &str, filename: &str, description: &str) -> Result<PublishStatus> {
        match self.execute(Command::Publish {
            user: user.to_string(),
            filename: filename.to_string(),
            description: description.to_string(),
        })? {
            Response::Publish(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub fn delete(&self, user: &str, filename: &str) -> Result<DeleteStatus> {
        match self.execute(Command::Delete {
            user: user.to_string(),
            filename: filename.to_string(),
        })? {
            Response::Delete(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub fn list_users(&self, user: &str) -> Result<(ListUsersStatus, Vec<PeerListing>)> {
        match self.execute(Command::ListUsers { user: user.to_string() })? {
            Response::ListUsers { status, peers } => Ok((status, peers)),
            other => Err(unexpected(other)),
        }
    }

    pub fn list_content(
        &self,
        user: &str,
        remote_user: &str,
    ) -> Result<(ListContentStatus, Vec<String>)> {
        match self.execute(Command::ListContent {
            user: user.to_string(),
            remote_user: remote_user.to_string(),
        })? {
            Response::ListContent { status, files } => Ok((status, files)),
            other => Err(unexpected(other)),
        }
    }
}

/// A client that remembers who it is acting as
///
/// REGISTER sets the session user and UNREGISTER clears it. PUBLISH, DELETE
/// and the listings are sent on behalf of the session user, or as
/// [`NO_SESSION_USER`] when there is none. CONNECT and DISCONNECT track the
/// user this session announced as online.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    registered: Option<String>,
    connected: Option<String>,
}

impl Session {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            registered: None,
            connected: None,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn registered_user(&self) -> Option<&str> {
        self.registered.as_deref()
    }

    pub fn connected_user(&self) -> Option<&str> {
        self.connected.as_deref()
    }

    /// User name sent with session-scoped requests
    pub fn session_user(&self) -> &str {
        self.registered.as_deref().unwrap_or(NO_SESSION_USER)
    }

    pub fn register(&mut self, user: &str) -> Result<RegisterStatus> {
        let status = self.client.register(user)?;
        if status.is_ok() {
            self.registered = Some(user.to_string());
        }
        Ok(status)
    }

    /// Unregister `user`, going offline first if this session connected it
    ///
    /// The session user is cleared whatever the server answers.
    pub fn unregister(&mut self, user: &str) -> Result<UnregisterStatus> {
        if self.connected.as_deref() == Some(user) {
            self.disconnect(user)?;
        }
        let result = self.client.unregister(user);
        self.registered = None;
        result
    }

    pub fn connect(&mut self, user: &str, port: u16) -> Result<ConnectStatus> {
        let status = self.client.connect(user, port)?;
        if status.is_ok() {
            self.connected = Some(user.to_string());
        }
        Ok(status)
    }

    /// Go offline; the session forgets its connected user whatever the
    /// server answers.
    pub fn disconnect(&mut self, user: &str) -> Result<DisconnectStatus> {
        let result = self.client.disconnect(user);
        self.connected = None;
        result
    }

    pub fn publish(&self, filename: &str, description: &str) -> Result<PublishStatus> {
        self.client.publish(self.session_user(), filename, description)
    }

    pub fn delete(&self, filename: &str) -> Result<DeleteStatus> {
        self.client.delete(self.session_user(), filename)
    }

    pub fn list_users(&self) -> Result<(ListUsersStatus, Vec<PeerListing>)> {
        self.client.list_users(self.session_user())
    }

    pub fn list_content(&self, remote_user: &str) -> Result<(ListContentStatus, Vec<String>)> {
        self.client.list_content(self.session_user(), remote_user)
    }

    /// Go offline if this session is connected
    pub fn quit(&mut self) -> Result<()> {
        if let Some(user) = self.connected.clone() {
            self.disconnect(&user)?;
        }
        Ok(())
    }
}

fn unexpected(response: Response) -> crate::PeerdirError {
    crate::PeerdirError::Protocol(format!(
        "unexpected {} response",
        response.operation()
    ))
}
