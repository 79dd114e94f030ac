//! Protocol codec
//!
//! Token I/O plus encoding and decoding of requests and responses.
//!
//! ## Wire Format
//!
//! ### Token
//! ```text
//! ┌──────────────────────────┬──────┐
//! │  UTF-8 data (<= 255 B)   │ 0x00 │
//! └──────────────────────────┴──────┘
//! ```
//!
//! ### Status
//! One raw byte, scoped to the operation being answered.
//!
//! Reads block until the terminator arrives, the peer closes, or the OS
//! reports an error. There is no read timeout.

use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::net::IpAddr;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::error::{PeerdirError, Result};
use crate::registry::PeerListing;

use super::{
    Command, ConnectStatus, DeleteStatus, DisconnectStatus, ListContentStatus, ListUsersStatus,
    Operation, PublishStatus, RegisterStatus, Request, Response, UnregisterStatus,
};

/// Maximum data bytes in one token (the terminator is not counted)
pub const MAX_TOKEN_LEN: usize = 255;

/// Upper bound on pre-allocation when reading a list body
const MAX_LIST_PREALLOC: usize = 1024;

// =============================================================================
// Token I/O
// =============================================================================

/// Read one NUL-terminated token
///
/// Scans the buffered bytes for the terminator instead of reading one byte
/// at a time. Fails on EOF before the terminator, on I/O errors, on tokens
/// longer than [`MAX_TOKEN_LEN`], and on invalid UTF-8.
pub fn read_token<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut token = Vec::new();

    loop {
        let (complete, used) = {
            let available = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if available.is_empty() {
                return Err(PeerdirError::Io(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "stream closed before token terminator",
                )));
            }

            match available.iter().position(|&b| b == 0) {
                Some(end) => {
                    token.extend_from_slice(&available[..end]);
                    (true, end + 1)
                }
                None => {
                    token.extend_from_slice(available);
                    (false, available.len())
                }
            }
        };
        reader.consume(used);

        if token.len() > MAX_TOKEN_LEN {
            return Err(PeerdirError::TokenTooLong {
                limit: MAX_TOKEN_LEN,
            });
        }
        if complete {
            break;
        }
    }

    String::from_utf8(token)
        .map_err(|_| PeerdirError::Protocol("token is not valid UTF-8".to_string()))
}

/// Write one token followed by its terminator
pub fn write_token<W: Write>(writer: &mut W, token: &str) -> Result<()> {
    let mut buf = BytesMut::with_capacity(token.len() + 1);
    put_token(&mut buf, token)?;
    writer.write_all(&buf)?;
    Ok(())
}

/// Write a single status byte
pub fn write_status<W: Write>(writer: &mut W, code: u8) -> Result<()> {
    writer.write_all(&[code])?;
    Ok(())
}

/// Read a single status byte
pub fn read_status<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn put_token(buf: &mut BytesMut, token: &str) -> Result<()> {
    if token.as_bytes().contains(&0) {
        return Err(PeerdirError::Protocol(
            "token contains a NUL byte".to_string(),
        ));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(PeerdirError::TokenTooLong {
            limit: MAX_TOKEN_LEN,
        });
    }
    buf.put_slice(token.as_bytes());
    buf.put_u8(0);
    Ok(())
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Failure to read a complete request
///
/// `operation` is set once the operation and timestamp tokens were read and
/// the operation was recognized, so the caller knows whether an error status
/// is owed to the client.
#[derive(Debug, Error)]
#[error("failed to decode request: {source}")]
pub struct DecodeError {
    pub operation: Option<Operation>,
    pub source: PeerdirError,
}

impl DecodeError {
    fn before_operation(source: PeerdirError) -> Self {
        Self {
            operation: None,
            source,
        }
    }
}

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(64);
    put_token(&mut buf, request.operation().as_str())?;
    put_token(&mut buf, &request.timestamp)?;

    match &request.command {
        Command::Register { user }
        | Command::Unregister { user }
        | Command::Disconnect { user }
        | Command::ListUsers { user } => {
            put_token(&mut buf, user)?;
        }
        Command::Connect { user, port } => {
            put_token(&mut buf, user)?;
            put_token(&mut buf, &port.to_string())?;
        }
        Command::Publish {
            user,
            filename,
            description,
        } => {
            put_token(&mut buf, user)?;
            put_token(&mut buf, filename)?;
            put_token(&mut buf, description)?;
        }
        Command::Delete { user, filename } => {
            put_token(&mut buf, user)?;
            put_token(&mut buf, filename)?;
        }
        Command::ListContent { user, remote_user } => {
            put_token(&mut buf, user)?;
            put_token(&mut buf, remote_user)?;
        }
    }

    Ok(buf.freeze())
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete request from a stream
///
/// Blocks until every token of the request is received or an error occurs.
pub fn read_request<R: BufRead>(reader: &mut R) -> std::result::Result<Request, DecodeError> {
    let op_token =
        required_token(reader, "operation").map_err(DecodeError::before_operation)?;
    let timestamp =
        required_token(reader, "timestamp").map_err(DecodeError::before_operation)?;
    let operation: Operation = op_token.parse().map_err(DecodeError::before_operation)?;

    let command = decode_command(reader, operation).map_err(|source| DecodeError {
        operation: Some(operation),
        source,
    })?;

    Ok(Request { timestamp, command })
}

fn decode_command<R: BufRead>(reader: &mut R, operation: Operation) -> Result<Command> {
    let user = required_token(reader, "username")?;

    let command = match operation {
        Operation::Register => Command::Register { user },
        Operation::Unregister => Command::Unregister { user },
        Operation::Connect => {
            let port = parse_port(&required_token(reader, "port")?);
            Command::Connect { user, port }
        }
        Operation::Disconnect => Command::Disconnect { user },
        Operation::Publish => {
            let filename = required_token(reader, "filename")?;
            let description = read_token(reader)?;
            Command::Publish {
                user,
                filename,
                description,
            }
        }
        Operation::Delete => {
            let filename = required_token(reader, "filename")?;
            Command::Delete { user, filename }
        }
        Operation::ListUsers => Command::ListUsers { user },
        Operation::ListContent => {
            let remote_user = required_token(reader, "remote username")?;
            Command::ListContent { user, remote_user }
        }
    };

    Ok(command)
}

/// Read a token that must not be empty
fn required_token<R: BufRead>(reader: &mut R, field: &'static str) -> Result<String> {
    let token = read_token(reader)?;
    if token.is_empty() {
        return Err(PeerdirError::EmptyToken(field));
    }
    Ok(token)
}

/// Lenient port parsing: a non-empty token that is not a valid port
/// becomes 0
fn parse_port(token: &str) -> u16 {
    token.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid port token {:?}, recording port 0", token);
        0
    })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + body tokens for a successful listing
pub fn encode_response(response: &Response) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(response.status_code());

    match response {
        Response::ListUsers { status, peers } if status.is_ok() => {
            put_token(&mut buf, &peers.len().to_string())?;
            for peer in peers {
                put_token(&mut buf, &peer.name)?;
                put_token(&mut buf, &peer.address.to_string())?;
                put_token(&mut buf, &peer.port.to_string())?;
            }
        }
        Response::ListContent { status, files } if status.is_ok() => {
            put_token(&mut buf, &files.len().to_string())?;
            for filename in files {
                put_token(&mut buf, filename)?;
            }
        }
        _ => {}
    }

    Ok(buf.freeze())
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read the response to an `operation` request from a stream
pub fn read_response<R: BufRead>(reader: &mut R, operation: Operation) -> Result<Response> {
    let code = read_status(reader)?;

    let response = match operation {
        Operation::Register => Response::Register(RegisterStatus::from_code(code)?),
        Operation::Unregister => Response::Unregister(UnregisterStatus::from_code(code)?),
        Operation::Connect => Response::Connect(ConnectStatus::from_code(code)?),
        Operation::Disconnect => Response::Disconnect(DisconnectStatus::from_code(code)?),
        Operation::Publish => Response::Publish(PublishStatus::from_code(code)?),
        Operation::Delete => Response::Delete(DeleteStatus::from_code(code)?),
        Operation::ListUsers => {
            let status = ListUsersStatus::from_code(code)?;
            if !status.is_ok() {
                return Ok(Response::list_users_failed(status));
            }
            let count = read_count(reader)?;
            let mut peers = Vec::with_capacity(count.min(MAX_LIST_PREALLOC));
            for _ in 0..count {
                let name = read_token(reader)?;
                let address = parse_field::<IpAddr>(&read_token(reader)?, "address")?;
                let port = parse_field::<u16>(&read_token(reader)?, "port")?;
                peers.push(PeerListing {
                    name,
                    address,
                    port,
                });
            }
            Response::ListUsers { status, peers }
        }
        Operation::ListContent => {
            let status = ListContentStatus::from_code(code)?;
            if !status.is_ok() {
                return Ok(Response::list_content_failed(status));
            }
            let count = read_count(reader)?;
            let mut files = Vec::with_capacity(count.min(MAX_LIST_PREALLOC));
            for _ in 0..count {
                files.push(read_token(reader)?);
            }
            Response::ListContent { status, files }
        }
    };

    Ok(response)
}

fn read_count<R: BufRead>(reader: &mut R) -> Result<usize> {
    parse_field(&read_token(reader)?, "count")
}

fn parse_field<T: std::str::FromStr>(token: &str, field: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| PeerdirError::Protocol(format!("invalid {} token: {:?}", field, token)))
}
