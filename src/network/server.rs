//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::directory::Directory;
use crate::error::{PeerdirError, Result};

use super::Connection;

/// How long the shutdown wake-up connection may take
const WAKE_TIMEOUT: Duration = Duration::from_millis(500);

/// TCP server for peerdir
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    directory: Directory,
    audit: AuditLog,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listening socket described by the config
    pub fn bind(config: &Config, directory: Directory, audit: AuditLog) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            PeerdirError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            directory,
            audit,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the directory served by this server
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Handle that stops [`Server::run`] from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Accept connections until shutdown is requested (blocking)
    ///
    /// Workers are detached: `run` never waits for them, and they may still
    /// be running when it returns.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Accepting connections on {}", self.local_addr);
        let mut next_id: u64 = 0;

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => {
                    next_id += 1;
                    let id = next_id;
                    self.spawn_worker(id, stream);
                }
                Err(e) => {
                    tracing::warn!("Error accepting connection: {}", e);
                }
            }
        }

        tracing::info!("Acceptor on {} stopped", self.local_addr);
        Ok(())
    }

    fn spawn_worker(&self, id: u64, stream: TcpStream) {
        let directory = self.directory.clone();
        let audit = self.audit.clone();

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                let result =
                    Connection::new(stream, directory, audit).and_then(Connection::handle);
                if let Err(e) = result {
                    tracing::debug!("Connection {} ended with error: {}", id, e);
                }
            });

        // The stream moved into the closure is dropped, closing it
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn worker for connection {}: {}", id, e);
        }
    }

    /// Signal the acceptor loop to stop
    pub fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }
}

/// Stops a running [`Server`] from another thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Request shutdown and wake the blocked acceptor
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            tracing::debug!("Shutdown wake-up connection failed: {}", e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Loopback equivalent of a wildcard listen address
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}
