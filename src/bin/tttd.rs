//! TTT Daemon - Two-player tic-tac-toe server
//!
//! Hosts a single game: seats the first two connections, runs the game to
//! a win, draw or abort, then exits.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (localhost:8080)
//! tttd
//!
//! # Listen elsewhere
//! tttd --addr 0.0.0.0:9000
//! TTT_ADDR=0.0.0.0:9000 tttd
//!
//! # Load settings from a file
//! tttd --config tttd.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tttd::config::ServerConfig;
use tttd::server::GameServer;

/// Tic-tac-toe server
#[derive(Parser, Debug)]
#[command(name = "tttd", version, about)]
struct Args {
    /// Address to listen on (host:port)
    #[arg(long)]
    addr: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tttd=info".parse()?)
                .add_directive("ttt_core=info".parse()?)
                .add_directive("ttt_protocol=info".parse()?),
        )
        .init();

    let config = ServerConfig::resolve(args.config.as_deref(), args.addr)
        .context("Failed to load server configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.addr,
        "Tic-tac-toe server starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let server = GameServer::bind(config, cancel_token)
        .await
        .context("Failed to start server")?;

    match server.run().await {
        Ok(Some(outcome)) => info!(outcome = ?outcome, "Game over"),
        Ok(None) => info!("Stopped before the game finished"),
        Err(e) => {
            error!(error = %e, "Server error");
            return Err(e.into());
        }
    }

    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
