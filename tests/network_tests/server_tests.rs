//! Server Tests
//!
//! End-to-end tests over real loopback TCP connections:
//! - Full request/response exchanges through `Client`
//! - Peer address taken from the socket on CONNECT
//! - Malformed and unknown requests
//! - Concurrent registrations over separate connections
//! - Client sessions and the no-session user
//! - Audit forwarding
//! - Shutdown

use std::io::{ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use peerdir::audit::{AuditLog, AuditRecord};
use peerdir::network::{Server, ShutdownHandle};
use peerdir::protocol::{
    ConnectStatus, DeleteStatus, ListContentStatus, ListUsersStatus, PublishStatus,
    RegisterStatus, UnregisterStatus, NO_SESSION_USER,
};
use peerdir::{Client, Config, Directory, PeerdirError, Session};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    directory: Directory,
    audit: Receiver<AuditRecord>,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        let config = Config::builder().listen_addr("127.0.0.1:0").build();
        let directory = Directory::new(&config);

        let (sender, receiver) = channel::unbounded();
        let audit = AuditLog::spawn(sender, 1024).unwrap();

        let server = Server::bind(&config, directory.clone(), audit).unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            directory,
            audit: receiver,
            shutdown,
            thread: Some(thread),
        }
    }

    fn client(&self) -> Client {
        Client::new(self.addr.to_string())
    }

    /// Send raw bytes, half-close, and return everything the server wrote
    fn raw_exchange(&self, bytes: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(RECV_TIMEOUT)).unwrap();
        stream.write_all(bytes).unwrap();
        stream.shutdown(Shutdown::Write).unwrap();

        let mut reply = Vec::new();
        match stream.read_to_end(&mut reply) {
            Ok(_) => {}
            // Server closed with request bytes still unread
            Err(e) if e.kind() == ErrorKind::ConnectionReset => {}
            Err(e) => panic!("read failed: {}", e),
        }
        reply
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn tokens(parts: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for part in parts {
        bytes.extend_from_slice(part.as_bytes());
        bytes.push(0);
    }
    bytes
}

// =============================================================================
// Basic Exchange Tests
// =============================================================================

#[test]
fn test_end_to_end_publish_sequence() {
    let server = TestServer::start();
    let client = server.client();

    assert_eq!(client.register("alice").unwrap(), RegisterStatus::Ok);
    assert_eq!(client.connect("alice", 9000).unwrap(), ConnectStatus::Ok);
    assert_eq!(client.publish("alice", "a.txt", "notes").unwrap(), PublishStatus::Ok);
    assert_eq!(
        client.publish("alice", "a.txt", "dup").unwrap(),
        PublishStatus::AlreadyPublished
    );
    assert_eq!(client.delete("alice", "a.txt").unwrap(), DeleteStatus::Ok);
    assert_eq!(
        client.delete("alice", "a.txt").unwrap(),
        DeleteStatus::NotPublished
    );
}

#[test]
fn test_register_and_unregister() {
    let server = TestServer::start();
    let client = server.client();

    assert_eq!(client.register("alice").unwrap(), RegisterStatus::Ok);
    assert_eq!(client.register("alice").unwrap(), RegisterStatus::UserExists);
    assert_eq!(client.unregister("bob").unwrap(), UnregisterStatus::UnknownUser);
    assert_eq!(client.unregister("alice").unwrap(), UnregisterStatus::Ok);
    assert_eq!(server.directory.peer_count(), 0);
}

#[test]
fn test_connect_records_socket_address() {
    let server = TestServer::start();
    let client = server.client();
    client.register("alice").unwrap();
    client.connect("alice", 9000).unwrap();

    let (status, peers) = client.list_users("alice").unwrap();

    assert_eq!(status, ListUsersStatus::Ok);
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].name, "alice");
    assert_eq!(peers[0].address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(peers[0].port, 9000);
}

#[test]
fn test_list_users_hides_unconnected_peers() {
    let server = TestServer::start();
    let client = server.client();
    client.register("alice").unwrap();
    client.connect("alice", 9000).unwrap();
    client.register("bob").unwrap();

    let (_, peers) = client.list_users("alice").unwrap();
    let names: Vec<&str> = peers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alice"]);

    let (status, peers) = client.list_users("bob").unwrap();
    assert_eq!(status, ListUsersStatus::NotConnected);
    assert!(peers.is_empty());
}

#[test]
fn test_list_content_over_tcp() {
    let server = TestServer::start();
    let client = server.client();
    for (user, port) in [("alice", 9000), ("bob", 9001)] {
        client.register(user).unwrap();
        client.connect(user, port).unwrap();
    }
    client.publish("bob", "song.mp3", "a song").unwrap();

    let (status, files) = client.list_content("alice", "bob").unwrap();
    assert_eq!(status, ListContentStatus::Ok);
    assert_eq!(files, vec!["song.mp3"]);

    let (status, files) = client.list_content("alice", "ghost").unwrap();
    assert_eq!(status, ListContentStatus::UnknownRemoteUser);
    assert!(files.is_empty());
}

#[test]
fn test_sentinel_user_over_tcp() {
    let server = TestServer::start();
    let client = server.client();

    assert_eq!(
        client.publish(NO_SESSION_USER, "a.txt", "").unwrap(),
        PublishStatus::UnknownUser
    );
    let (status, _) = client.list_users(NO_SESSION_USER).unwrap();
    assert_eq!(status, ListUsersStatus::UnknownUser);
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_session_without_user_sends_sentinel() {
    let server = TestServer::start();
    let session = Session::new(server.client());

    assert_eq!(session.session_user(), NO_SESSION_USER);
    assert_eq!(session.publish("a.txt", "notes").unwrap(), PublishStatus::UnknownUser);
    assert_eq!(session.delete("a.txt").unwrap(), DeleteStatus::UnknownUser);
    assert_eq!(session.list_users().unwrap().0, ListUsersStatus::UnknownUser);

    let record = server.audit.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(record.user, NO_SESSION_USER);
}

#[test]
fn test_session_acts_as_registered_user() {
    let server = TestServer::start();
    let mut session = Session::new(server.client());

    assert_eq!(session.register("alice").unwrap(), RegisterStatus::Ok);
    assert_eq!(session.connect("alice", 9000).unwrap(), ConnectStatus::Ok);
    assert_eq!(session.connected_user(), Some("alice"));
    assert_eq!(session.publish("a.txt", "notes").unwrap(), PublishStatus::Ok);

    let (status, files) = session.list_content("alice").unwrap();
    assert_eq!(status, ListContentStatus::Ok);
    assert_eq!(files, vec!["a.txt"]);
}

#[test]
fn test_session_unregister_disconnects_first() {
    let server = TestServer::start();
    let mut session = Session::new(server.client());
    session.register("alice").unwrap();
    session.connect("alice", 9000).unwrap();

    assert_eq!(session.unregister("alice").unwrap(), UnregisterStatus::Ok);
    assert_eq!(session.registered_user(), None);
    assert_eq!(session.connected_user(), None);
    assert_eq!(session.list_users().unwrap().0, ListUsersStatus::UnknownUser);
    assert_eq!(server.directory.peer_count(), 0);
}

#[test]
fn test_failed_register_keeps_no_session() {
    let server = TestServer::start();
    server.client().register("alice").unwrap();

    let mut session = Session::new(server.client());
    assert_eq!(session.register("alice").unwrap(), RegisterStatus::UserExists);
    assert_eq!(session.session_user(), NO_SESSION_USER);
}

// =============================================================================
// Malformed Request Tests
// =============================================================================

#[test]
fn test_unknown_operation_gets_no_reply() {
    let server = TestServer::start();
    let reply = server.raw_exchange(&tokens(&["FROBNICATE", "ts", "alice"]));
    assert!(reply.is_empty());
}

#[test]
fn test_truncated_register_gets_no_reply() {
    let server = TestServer::start();
    let reply = server.raw_exchange(&tokens(&["REGISTER", "ts"]));
    assert!(reply.is_empty());
    assert_eq!(server.directory.peer_count(), 0);
}

#[test]
fn test_truncated_publish_gets_status_4() {
    let server = TestServer::start();
    let reply = server.raw_exchange(&tokens(&["PUBLISH", "ts", "alice", "a.txt"]));
    assert_eq!(reply, vec![4u8]);
}

#[test]
fn test_truncated_delete_gets_status_4() {
    let server = TestServer::start();
    let reply = server.raw_exchange(&tokens(&["DELETE", "ts", "alice"]));
    assert_eq!(reply, vec![4u8]);
}

#[test]
fn test_empty_connect_port_gets_no_reply() {
    let server = TestServer::start();
    let client = server.client();
    client.register("alice").unwrap();

    let reply = server.raw_exchange(&tokens(&["CONNECT", "ts", "alice", ""]));
    assert!(reply.is_empty());

    // alice is still offline, so a real CONNECT goes through
    assert_eq!(client.connect("alice", 9000).unwrap(), ConnectStatus::Ok);
    let (_, peers) = client.list_users("alice").unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].port, 9000);
}

#[test]
fn test_empty_timestamp_gets_no_reply() {
    let server = TestServer::start();
    let reply = server.raw_exchange(&tokens(&["REGISTER", "", "alice"]));
    assert!(reply.is_empty());
    assert_eq!(server.directory.peer_count(), 0);

    let reply = server.raw_exchange(&tokens(&["PUBLISH", "", "alice", "a.txt", "d"]));
    assert!(reply.is_empty());
}

#[test]
fn test_oversized_token_closes_connection() {
    let server = TestServer::start();
    let long = "x".repeat(300);
    let reply = server.raw_exchange(&tokens(&["REGISTER", "ts", &long]));
    assert!(reply.is_empty());
    assert_eq!(server.directory.peer_count(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_register_over_tcp() {
    let server = TestServer::start();
    let mut handles = vec![];

    for _ in 0..16 {
        let client = server.client();
        handles.push(thread::spawn(move || client.register("alice").unwrap()));
    }

    let statuses: Vec<RegisterStatus> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(statuses.iter().filter(|s| **s == RegisterStatus::Ok).count(), 1);
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == RegisterStatus::UserExists)
            .count(),
        15
    );
    assert_eq!(server.directory.peer_count(), 1);
}

#[test]
fn test_stalled_client_does_not_block_others() {
    let server = TestServer::start();

    // Half a request, never finished
    let mut stalled = TcpStream::connect(server.addr).unwrap();
    stalled.write_all(b"REGISTER\0ts\0ali").unwrap();

    assert_eq!(server.client().register("bob").unwrap(), RegisterStatus::Ok);
    drop(stalled);
}

// =============================================================================
// Audit Tests
// =============================================================================

#[test]
fn test_decoded_requests_are_audited() {
    let server = TestServer::start();
    let client = server.client();

    client.register("alice").unwrap();
    client.register("alice").unwrap();

    for _ in 0..2 {
        let record = server.audit.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(record.user, "alice");
        assert_eq!(record.operation, "REGISTER");
        assert!(!record.timestamp.is_empty());
    }
}

#[test]
fn test_audit_uses_client_timestamp() {
    let server = TestServer::start();
    server.raw_exchange(&tokens(&["REGISTER", "24/12/2024 18:30:00", "alice"]));

    let record = server.audit.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(
        record,
        AuditRecord::new("alice", "REGISTER", "24/12/2024 18:30:00")
    );
}

#[test]
fn test_unknown_operation_is_not_audited() {
    let server = TestServer::start();
    server.raw_exchange(&tokens(&["FROBNICATE", "ts", "alice"]));
    server.client().register("bob").unwrap();

    let record = server.audit.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(record.user, "bob");
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_bind_rejects_invalid_config() {
    let config = Config::builder().listen_addr("").build();
    let directory = Directory::new(&config);

    let result = Server::bind(&config, directory, AuditLog::disabled());
    assert!(matches!(result, Err(PeerdirError::Config(_))));
}

#[test]
fn test_shutdown_stops_acceptor() {
    let mut server = TestServer::start();
    server.client().register("alice").unwrap();

    server.shutdown.shutdown();
    assert!(server.shutdown.is_shutdown());
    server.thread.take().unwrap().join().unwrap();

    let stats = server.directory.drain();
    assert_eq!(stats.peers, 1);
    assert!(server.client().register("bob").is_err());
}
