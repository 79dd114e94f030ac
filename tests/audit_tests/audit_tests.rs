//! Audit Tests
//!
//! Tests verify:
//! - Records reach the sink in order
//! - Failing sinks never surface to the caller
//! - A full queue drops records instead of blocking
//! - The TCP sink wire format

use std::io::BufReader;
use std::net::TcpListener;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use peerdir::audit::{AuditLog, AuditRecord, AuditSink, TcpSink, TracingSink};
use peerdir::protocol::read_token;
use peerdir::{Config, PeerdirError, Result};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Helper Sinks
// =============================================================================

/// Always fails
struct BrokenSink;

impl AuditSink for BrokenSink {
    fn record(&mut self, _record: &AuditRecord) -> Result<()> {
        Err(PeerdirError::Audit("collector unreachable".to_string()))
    }
}

/// Announces each record, then blocks on a barrier before forwarding it
struct GatedSink {
    entered: channel::Sender<()>,
    gate: Arc<Barrier>,
    out: channel::Sender<AuditRecord>,
}

impl AuditSink for GatedSink {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        let _ = self.entered.send(());
        self.gate.wait();
        let _ = self.out.send(record.clone());
        Ok(())
    }
}

// =============================================================================
// AuditLog Tests
// =============================================================================

#[test]
fn test_records_arrive_in_order() {
    let (sender, receiver) = channel::unbounded();
    let audit = AuditLog::spawn(sender, 16).unwrap();

    audit.notify(AuditRecord::new("alice", "REGISTER", "t1"));
    audit.notify(AuditRecord::new("alice", "CONNECT", "t2"));

    assert_eq!(receiver.recv_timeout(RECV_TIMEOUT).unwrap().operation, "REGISTER");
    assert_eq!(receiver.recv_timeout(RECV_TIMEOUT).unwrap().operation, "CONNECT");
}

#[test]
fn test_clones_share_worker() {
    let (sender, receiver) = channel::unbounded();
    let audit = AuditLog::spawn(sender, 16).unwrap();
    let clone = audit.clone();

    clone.notify(AuditRecord::new("bob", "DISCONNECT", "t"));

    assert_eq!(receiver.recv_timeout(RECV_TIMEOUT).unwrap().user, "bob");
}

#[test]
fn test_broken_sink_is_ignored() {
    let audit = AuditLog::spawn(BrokenSink, 4).unwrap();
    for _ in 0..10 {
        audit.notify(AuditRecord::new("alice", "PUBLISH", "t"));
    }
}

#[test]
fn test_disabled_log_discards() {
    let audit = AuditLog::disabled();
    audit.notify(AuditRecord::new("alice", "REGISTER", "t"));
}

#[test]
fn test_full_queue_drops_instead_of_blocking() {
    let gate = Arc::new(Barrier::new(2));
    let (entered, worker_busy) = channel::unbounded();
    let (out, received) = channel::unbounded();
    let audit = AuditLog::spawn(
        GatedSink {
            entered,
            gate: Arc::clone(&gate),
            out,
        },
        1,
    )
    .unwrap();

    // Park the worker on the first record
    audit.notify(AuditRecord::new("alice", "PUBLISH", "0"));
    worker_busy.recv_timeout(RECV_TIMEOUT).unwrap();

    // One more fits in the queue, the rest are dropped without blocking
    for i in 1..10 {
        audit.notify(AuditRecord::new("alice", "PUBLISH", i.to_string()));
    }

    gate.wait();
    assert_eq!(received.recv_timeout(RECV_TIMEOUT).unwrap().timestamp, "0");

    worker_busy.recv_timeout(RECV_TIMEOUT).unwrap();
    gate.wait();
    assert_eq!(received.recv_timeout(RECV_TIMEOUT).unwrap().timestamp, "1");

    drop(audit);
    assert!(received.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_from_config_without_collector() {
    let audit = AuditLog::from_config(&Config::default()).unwrap();
    audit.notify(AuditRecord::new("alice", "REGISTER", "t"));
}

#[test]
fn test_from_config_rejects_zero_queue() {
    let config = Config::builder().audit_queue_capacity(0).build();
    let err = AuditLog::from_config(&config).unwrap_err();
    assert!(matches!(err, PeerdirError::Config(_)));
}

#[test]
fn test_from_config_rejects_collector_without_timeout() {
    let config = Config::builder()
        .audit_addr(Some("127.0.0.1:7777".to_string()))
        .audit_timeout_ms(0)
        .build();
    assert!(matches!(
        AuditLog::from_config(&config),
        Err(PeerdirError::Config(_))
    ));
}

#[test]
fn test_tracing_sink_never_fails() {
    let mut sink = TracingSink;
    assert!(sink.record(&AuditRecord::new("a", "b", "c")).is_ok());
}

// =============================================================================
// TcpSink Tests
// =============================================================================

#[test]
fn test_tcp_sink_writes_three_tokens() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let collector = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        (
            read_token(&mut reader).unwrap(),
            read_token(&mut reader).unwrap(),
            read_token(&mut reader).unwrap(),
        )
    });

    let mut sink = TcpSink::new(addr.to_string(), 1000);
    sink.record(&AuditRecord::new("alice", "LIST_USERS", "01/02/2024 03:04:05"))
        .unwrap();

    let (user, operation, timestamp) = collector.join().unwrap();
    assert_eq!(user, "alice");
    assert_eq!(operation, "LIST_USERS");
    assert_eq!(timestamp, "01/02/2024 03:04:05");
}

#[test]
fn test_tcp_sink_unreachable_collector() {
    // Bind then drop to get a port with nothing listening
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let mut sink = TcpSink::new(addr.to_string(), 200);
    assert!(sink.record(&AuditRecord::new("a", "b", "c")).is_err());
}
