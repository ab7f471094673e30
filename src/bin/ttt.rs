//! TTT - Terminal client for the tic-tac-toe server
//!
//! ```bash
//! ttt                       # connect to localhost:8080
//! ttt --addr host:9000
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ttt_client::{ClientConfig, GameClient};
use ttt_protocol::{ADDR_ENV, DEFAULT_ADDR};

/// Tic-tac-toe client
#[derive(Parser, Debug)]
#[command(name = "ttt", version, about)]
struct Args {
    /// Server address (host:port)
    #[arg(long, env = ADDR_ENV, default_value = DEFAULT_ADDR)]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only game text
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ttt_client=warn".parse()?),
        )
        .init();

    let client = GameClient::new(ClientConfig { addr: args.addr });
    let exit = client.run().await.context("Client failed")?;
    debug!(exit = ?exit, "Client finished");

    Ok(())
}
