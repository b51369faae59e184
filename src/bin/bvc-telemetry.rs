//! bvc-telemetry binary
//!
//! Standalone adapter: reads a JSON roster file that the host keeps current
//! and ships it to a BVC server on every tick.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                       | Default | Description                          |
//! |---------------------------|---------|--------------------------------------|
//! | `BVC_BVC_SERVER`          | –       | External BVC server base URL         |
//! | `BVC_ACCESS_TOKEN`        | –       | Shared secret sent with every POST   |
//! | `BVC_MINIMUM_PLAYERS`     | `2`     | Players required before sending      |
//! | `BVC_POLL_INTERVAL_MS`    | `250`   | Tick period                          |
//! | `BVC_REQUEST_TIMEOUT_MS`  | `1000`  | Per-request timeout                  |
//! | `BVC_DEBUG`               | `false` | Send even below the player threshold |
//!
//! Command-line flags override both the file and the environment.

use anyhow::Result;
use bvc_telemetry::{
    agent::TelemetryAgent, config::RuntimeConfig, provider::DirectQueryProvider,
    provider::FileWorld,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "bvc-telemetry", about = "BVC position telemetry adapter", version)]
struct Args {
    /// TOML config file
    #[arg(long, env = "BVC_CONFIG", default_value = "config/bvc-telemetry.toml")]
    config: PathBuf,

    /// JSON roster file written by the host
    #[arg(long, env = "BVC_ROSTER", default_value = "players.json")]
    roster: PathBuf,

    /// External BVC server base URL
    #[arg(long)]
    bvc_server: Option<String>,

    /// Access token for the BVC server
    #[arg(long)]
    access_token: Option<String>,

    /// Minimum players before positions are sent
    #[arg(long)]
    minimum_players: Option<usize>,

    /// Tick period in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Send regardless of the player threshold
    #[arg(long)]
    debug: bool,

    /// Log directive for this crate (e.g. `info`, `trace`)
    #[arg(long, env = "BVC_LOG_LEVEL", default_value = "debug")]
    log_level: String,

    /// Data directory for the embedded server
    #[cfg(feature = "native")]
    #[arg(long, env = "BVC_DATA_DIR", default_value = "bvc-data")]
    data_dir: PathBuf,

    /// Write a default config file if none exists, then exit
    #[arg(long)]
    write_default_config: bool,
}

impl Args {
    fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(server) = &self.bvc_server {
            config.bvc_server = Some(server.clone());
        }
        if let Some(token) = &self.access_token {
            config.access_token = Some(token.clone());
        }
        if let Some(minimum) = self.minimum_players {
            config.minimum_players = minimum;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        config.debug |= self.debug;
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("bvc_telemetry={}", args.log_level).parse()?),
        )
        .init();

    if args.write_default_config {
        if RuntimeConfig::create_default_if_missing(&args.config)? {
            log::info!("Wrote default config to {}", args.config.display());
        } else {
            log::info!("Config already exists at {}", args.config.display());
        }
        return Ok(());
    }

    let mut config = RuntimeConfig::load(Some(args.config.as_path()))?;
    args.apply(&mut config);

    log::info!(
        "Starting bvc-telemetry (roster='{}', game={}, embedded={})",
        args.roster.display(),
        config.game.as_str(),
        config.use_embedded_server,
    );

    let provider = DirectQueryProvider::new(FileWorld::new(&args.roster), config.game)
        .with_deafen_rule(config.deafen_rule);

    let agent = TelemetryAgent::new(Arc::new(config), Arc::new(provider));
    #[cfg(feature = "native")]
    let agent = agent.with_bridge(
        Arc::new(bvc_telemetry::ffi::NativeLibrary::new()),
        &args.data_dir,
    );

    // Run until shutdown
    let stats = agent.run().await?;
    log::info!("Final stats: {}", serde_json::to_string(&stats)?);
    Ok(())
}
