//! peerdir CLI Client
//!
//! Command-line interface for a peerdir server. Each subcommand sends one
//! request; `shell` reads commands from stdin and keeps a session between
//! them.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use peerdir::{Client, Session};
use tracing_subscriber::{fmt, EnvFilter};

/// peerdir CLI
#[derive(Parser, Debug)]
#[command(name = "peerdir-cli")]
#[command(about = "CLI for the peerdir directory server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a user
    Register { user: String },

    /// Unregister a user
    Unregister { user: String },

    /// Announce that a user accepts connections on a port
    Connect { user: String, port: u16 },

    /// Mark a user offline
    Disconnect { user: String },

    /// Publish a file
    Publish {
        user: String,
        filename: String,
        #[arg(default_value = "")]
        description: String,
    },

    /// Withdraw a published file
    Delete { user: String, filename: String },

    /// List connected users
    ListUsers { user: String },

    /// List the files published by another user
    ListContent { user: String, remote_user: String },

    /// Interactive session: PUBLISH, DELETE and LIST_* act as the
    /// registered user
    Shell,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let client = Client::new(&args.server);

    match run(&client, args.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run one command; `Ok(false)` means the server refused it
fn run(client: &Client, command: Commands) -> peerdir::Result<bool> {
    let ok = match command {
        Commands::Register { user } => report(client.register(&user)?),
        Commands::Unregister { user } => report(client.unregister(&user)?),
        Commands::Connect { user, port } => report(client.connect(&user, port)?),
        Commands::Disconnect { user } => report(client.disconnect(&user)?),
        Commands::Publish {
            user,
            filename,
            description,
        } => report(client.publish(&user, &filename, &description)?),
        Commands::Delete { user, filename } => report(client.delete(&user, &filename)?),
        Commands::ListUsers { user } => {
            let (status, peers) = client.list_users(&user)?;
            if status.is_ok() {
                println!("CONNECTED USERS ({}):", peers.len());
                for peer in peers {
                    println!("  {}\t{}\t{}", peer.name, peer.address, peer.port);
                }
            }
            report(status)
        }
        Commands::ListContent { user, remote_user } => {
            let (status, files) = client.list_content(&user, &remote_user)?;
            if status.is_ok() {
                println!("FILES OF {} ({}):", remote_user, files.len());
                for file in files {
                    println!("  {}", file);
                }
            }
            report(status)
        }
        Commands::Shell => {
            shell(Session::new(client.clone()))?;
            true
        }
    };
    Ok(ok)
}

const SHELL_USAGE: &str = "commands: REGISTER <user> | UNREGISTER <user> | CONNECT <user> <port> | \
DISCONNECT <user> | PUBLISH <file> <description> | DELETE <file> | LIST_USERS | \
LIST_CONTENT <user> | QUIT";

/// Read commands from stdin until QUIT or end of input
fn shell(mut session: Session) -> peerdir::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("c> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = words.first() else {
            continue;
        };

        if first.eq_ignore_ascii_case("QUIT") {
            break;
        }
        if let Err(e) = shell_command(&mut session, &first.to_ascii_uppercase(), &words[1..]) {
            println!("error: {}", e);
        }
    }

    session.quit()
}

fn shell_command(session: &mut Session, command: &str, args: &[&str]) -> peerdir::Result<()> {
    match (command, args) {
        ("REGISTER", [user]) => {
            report(session.register(user)?);
        }
        ("UNREGISTER", [user]) => {
            report(session.unregister(user)?);
        }
        ("CONNECT", [user, port]) => match port.parse::<u16>() {
            Ok(port) => {
                report(session.connect(user, port)?);
            }
            Err(_) => println!("invalid port: {}", port),
        },
        ("DISCONNECT", [user]) => {
            report(session.disconnect(user)?);
        }
        ("PUBLISH", [filename, description @ ..]) if !description.is_empty() => {
            report(session.publish(filename, &description.join(" "))?);
        }
        ("DELETE", [filename]) => {
            report(session.delete(filename)?);
        }
        ("LIST_USERS", []) => {
            let (status, peers) = session.list_users()?;
            for peer in &peers {
                println!("  {}\t{}\t{}", peer.name, peer.address, peer.port);
            }
            report(status);
        }
        ("LIST_CONTENT", [remote_user]) => {
            let (status, files) = session.list_content(remote_user)?;
            for file in &files {
                println!("  {}", file);
            }
            report(status);
        }
        _ => println!("{}", SHELL_USAGE),
    }
    Ok(())
}

fn report<S: std::fmt::Debug + Copy + Into<u8>>(status: S) -> bool {
    let code: u8 = status.into();
    println!("{:?} ({})", status, code);
    code == 0
}
