//! Driftbox server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:3010, 6h unseen TTL, 10m seen TTL, sweep every 60s
//! driftbox-server
//!
//! # Port from the environment, bounded store
//! PORT=8080 driftbox-server --max-messages 50000
//! ```
//!
//! A `.env` file in the working directory is loaded before arguments are
//! parsed. Variables already present in the environment take precedence.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use driftbox_core::StoreConfig;
use driftbox_server::{RateLimitConfig, Server, ServerError, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Driftbox ephemeral message relay
#[derive(Parser, Debug)]
#[command(name = "driftbox-server")]
#[command(about = "Ephemeral encrypted message relay")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, env = "DRIFTBOX_BIND", default_value = "0.0.0.0:3010")]
    bind: String,

    /// Port override for the bind address
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Seconds between background expiry sweeps
    #[arg(long, env = "DRIFTBOX_SWEEP_INTERVAL_SECS", default_value = "60")]
    sweep_interval_secs: u64,

    /// Seconds an unretrieved message stays available
    #[arg(long, env = "DRIFTBOX_UNSEEN_TTL_SECS", default_value = "21600")]
    unseen_ttl_secs: u64,

    /// Seconds a retrieved message lingers before removal
    #[arg(long, env = "DRIFTBOX_SEEN_TTL_SECS", default_value = "600")]
    seen_ttl_secs: u64,

    /// Maximum stored messages (unbounded if unset)
    #[arg(long, env = "DRIFTBOX_MAX_MESSAGES")]
    max_messages: Option<usize>,

    /// Requests allowed per client IP within the rate-limit window
    #[arg(long, env = "DRIFTBOX_RATE_LIMIT_MAX", default_value = "100")]
    rate_limit_max: u32,

    /// Rate-limit window in seconds
    #[arg(long, env = "DRIFTBOX_RATE_LIMIT_WINDOW_SECS", default_value = "900")]
    rate_limit_window_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn bind_address(&self) -> Result<String, ServerError> {
        let Some(port) = self.port else {
            return Ok(self.bind.clone());
        };

        let mut addr: SocketAddr = self.bind.parse().map_err(|e| {
            ServerError::Config(format!("cannot apply PORT to bind address {}: {e}", self.bind))
        })?;
        addr.set_port(port);
        Ok(addr.to_string())
    }

    fn into_config(self) -> Result<ServerRuntimeConfig, ServerError> {
        Ok(ServerRuntimeConfig {
            bind_address: self.bind_address()?,
            store: StoreConfig {
                unseen_ttl: Duration::from_secs(self.unseen_ttl_secs),
                seen_ttl: Duration::from_secs(self.seen_ttl_secs),
                max_records: self.max_messages,
            },
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            rate_limit: RateLimitConfig {
                max_requests: self.rate_limit_max,
                window: Duration::from_secs(self.rate_limit_window_secs),
                ..RateLimitConfig::default()
            },
        })
    }
}

/// Outcome of loading a `.env` file.
#[derive(Debug)]
enum EnvFile {
    Loaded(PathBuf),
    Missing,
    Invalid(String),
}

impl From<dotenvy::Result<PathBuf>> for EnvFile {
    fn from(result: dotenvy::Result<PathBuf>) -> Self {
        match result {
            Ok(path) => Self::Loaded(path),
            Err(e) if e.not_found() => Self::Missing,
            Err(e) => Self::Invalid(e.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Before parsing, so clap's env fallbacks see the file's variables
    let env_file = EnvFile::from(dotenvy::dotenv());

    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match env_file {
        EnvFile::Loaded(path) => tracing::info!("Loaded environment from {}", path.display()),
        EnvFile::Missing => {},
        EnvFile::Invalid(reason) => tracing::warn!("Ignoring unreadable .env file: {}", reason),
    }

    let config = args.into_config()?;

    tracing::info!("Driftbox server starting");
    tracing::info!("Binding to {}", config.bind_address);

    if config.store.max_records.is_none() {
        tracing::warn!("No --max-messages set - message store is unbounded");
    }

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
