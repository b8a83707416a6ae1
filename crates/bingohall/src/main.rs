//! The `bingohall` server binary.

use std::time::Duration;

use bingohall::prelude::*;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Multiplayer Bingo server
#[derive(Parser, Debug)]
#[command(name = "bingohall")]
#[command(about = "Server-authoritative multiplayer Bingo over WebSocket", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Seconds a player has to mark before the turn is passed
    #[arg(long, default_value_t = 60)]
    turn_seconds: u64,

    /// Hours until a room is considered expired
    #[arg(long, default_value_t = 24)]
    room_ttl_hours: u64,

    /// Seconds of silence before a connection is closed
    #[arg(long, default_value_t = 120)]
    idle_seconds: u64,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind.clone(),
            idle_timeout: Duration::from_secs(self.idle_seconds),
            engine: EngineConfig {
                turn_duration: Duration::from_secs(self.turn_seconds),
                room_ttl: Duration::from_secs(self.room_ttl_hours * 60 * 60),
                ..EngineConfig::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BingoError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let server = BingoServerBuilder::new()
        .config(cli.server_config())
        .build()
        .await?;

    tracing::info!(
        addr = %cli.bind,
        turn_seconds = cli.turn_seconds,
        "starting Bingohall"
    );
    server.run().await
}
