//! peerdir Audit Collector
//!
//! Receives audit records from a peerdir server and prints them as
//! `<user> <operation> <timestamp>`, one per line.

use std::io::{self, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use clap::Parser;
use peerdir::audit::AuditRecord;
use peerdir::protocol::read_token;
use tracing_subscriber::{fmt, EnvFilter};

/// peerdir Audit Collector
#[derive(Parser, Debug)]
#[command(name = "peerdir-audit")]
#[command(about = "Prints audit records sent by a peerdir server")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:7777")]
    listen: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,peerdir=debug"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let listener = match TcpListener::bind(&args.listen) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Audit collector listening on {}", args.listen);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || {
                    if let Err(e) = receive(stream) {
                        tracing::warn!("Dropped audit record: {}", e);
                    }
                });
            }
            Err(e) => tracing::warn!("Error accepting connection: {}", e),
        }
    }
}

fn receive(stream: TcpStream) -> peerdir::Result<()> {
    let mut reader = BufReader::new(stream);
    let record = AuditRecord::new(
        read_token(&mut reader)?,
        read_token(&mut reader)?,
        read_token(&mut reader)?,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{} {} {}", record.user, record.operation, record.timestamp)?;
    out.flush()?;
    Ok(())
}
