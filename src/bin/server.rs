//! peerdir Server Binary
//!
//! Starts the directory server and drains the registry on Ctrl+C.

use clap::Parser;
use peerdir::audit::AuditLog;
use peerdir::network::Server;
use peerdir::{Config, Directory};
use tracing_subscriber::{fmt, EnvFilter};

/// Port the audit collector listens on when only a host is given
const DEFAULT_AUDIT_PORT: u16 = 7777;

/// peerdir Server
#[derive(Parser, Debug)]
#[command(name = "peerdir-server")]
#[command(about = "Directory and presence server for peer-to-peer file sharing")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Audit collector (host or host:port); audit goes to the local log if unset
    #[arg(long, env = "LOG_RPC_IP")]
    audit_addr: Option<String>,

    /// Initial capacity of the peer table
    #[arg(long, default_value = "100")]
    peer_capacity: usize,

    /// Initial capacity of each peer's file table
    #[arg(long, default_value = "10")]
    file_capacity: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,peerdir=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let audit_addr = args.audit_addr.map(|addr| {
        if addr.contains(':') {
            addr
        } else {
            format!("{}:{}", addr, DEFAULT_AUDIT_PORT)
        }
    });

    tracing::info!("peerdir server v{}", peerdir::VERSION);
    match &audit_addr {
        Some(addr) => tracing::info!("Audit collector: {}", addr),
        None => tracing::info!("Audit collector: local log"),
    }

    let config = Config::builder()
        .listen_addr(format!("{}:{}", args.host, args.port))
        .initial_peer_capacity(args.peer_capacity)
        .initial_file_capacity(args.file_capacity)
        .audit_addr(audit_addr)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let audit = match AuditLog::from_config(&config) {
        Ok(audit) => audit,
        Err(e) => {
            tracing::error!("Failed to start audit log: {}", e);
            std::process::exit(1);
        }
    };

    let directory = Directory::new(&config);
    let server = match Server::bind(&config, directory.clone(), audit) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("init server {}", server.local_addr());

    // Set up Ctrl+C handler
    let handle = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, closing server...");
        handle.shutdown();
    }) {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    // In-flight connections are not awaited; they see an empty registry
    let drained = directory.drain();
    tracing::info!(
        "Released {} peers and {} published files",
        drained.peers,
        drained.files
    );
    tracing::info!("Server stopped");
}
