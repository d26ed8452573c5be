//! # Plankton Relay Server
//!
//! Runs the relay on a UDP socket with an operator console on stdin.
//!
//! ## Usage
//!
//! ```bash
//! plankton_server --config plankton.toml --port 36000
//! RUST_LOG=plankton_relay=debug plankton_server
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use plankton_relay::{ConsoleCommand, RelayConfig, RelayResult, RelayServer, SystemClock, UdpTransport};

/// UDP relay for matchmade multiplayer rooms.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file; defaults apply if it does not exist.
    #[arg(short, long, default_value = "plankton.toml")]
    config: PathBuf,

    /// UDP port, overriding the configured bind address's port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Receive worker threads, overriding the configuration.
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> RelayResult<()> {
    use tracing_subscriber::{fmt, EnvFilter};
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut config = RelayConfig::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.bind_address.set_port(port);
    }
    if let Some(workers) = cli.workers {
        config.worker_threads = workers;
    }

    tracing::info!(
        "Starting relay: {} rooms x {} members, {} lobby slots",
        config.room_count,
        config.room_capacity,
        config.lobby_capacity()
    );

    let transport = UdpTransport::bind(config.bind_address, Duration::from_millis(config.recv_timeout_ms))?;
    let server = RelayServer::new(config, Arc::new(SystemClock::new()))?;
    let handle = server.start(Arc::new(transport))?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match ConsoleCommand::parse(&line) {
            Some(ConsoleCommand::Exit) => {
                handle.stop();
                return Ok(());
            }
            Some(command) => {
                if let Some(text) = command.execute(handle.state(), handle.transport().as_ref()) {
                    println!("{text}");
                }
            }
            None if line.trim().is_empty() => {}
            None => println!("Unknown command: {}", line.trim()),
        }
    }

    // Stdin closed (daemonized): keep serving until killed.
    tracing::info!("Console closed, serving without it");
    handle.wait();
    Ok(())
}
