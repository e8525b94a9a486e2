//! Driftbox production server.
//!
//! HTTP front end for the ephemeral sealed-message store, using axum on the
//! Tokio runtime with system time and cryptographic RNG.
//!
//! # Architecture
//!
//! This crate provides production "glue" around [`driftbox_core`]'s
//! synchronous store. The [`Relay`] adapter translates requests into store
//! operations, [`http`] binds it to routes, and a [`Sweeper`] task enforces
//! expiry independently of traffic.
//!
//! # Components
//!
//! - [`Relay`]: submit/retrieve adapter (transport-agnostic)
//! - [`http::router`]: axum routes, request logging and rate limiting
//! - [`Sweeper`]: periodic expiry pass with explicit shutdown
//! - [`Server`]: owns the listener, the store and the sweeper
//! - [`SystemEnv`]: production environment (real clock, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod http;
pub mod rate_limit;
pub mod relay;
mod sweeper;
mod system_env;

use std::{future::Future, net::SocketAddr, time::Duration};

use driftbox_core::{MessageStore, StoreConfig};
pub use error::ServerError;
pub use http::AppState;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use relay::{Relay, RelayError, RetrieveResponse, SubmitReceipt, SubmitRequest};
pub use sweeper::Sweeper;
pub use system_env::SystemEnv;
use tokio::net::TcpListener;

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3010")
    pub bind_address: String,
    /// Record lifecycle (TTLs, capacity)
    pub store: StoreConfig,
    /// Interval between background sweeps
    pub sweep_interval: Duration,
    /// Per-IP request limits
    pub rate_limit: RateLimitConfig,
}

impl ServerRuntimeConfig {
    /// Reject configurations the relay cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.sweep_interval.is_zero() {
            return Err(ServerError::Config("sweep interval must be non-zero".to_string()));
        }
        if self.store.unseen_ttl.is_zero() || self.store.seen_ttl.is_zero() {
            return Err(ServerError::Config("message TTLs must be non-zero".to_string()));
        }
        if self.store.max_records == Some(0) {
            return Err(ServerError::Config("max messages must be at least 1".to_string()));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window.is_zero() {
            return Err(ServerError::Config(
                "rate limit must allow at least one request per non-zero window".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3010".to_string(),
            store: StoreConfig::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Production Driftbox server.
///
/// Owns the TCP listener, the message store (through the handler state) and,
/// while running, the sweeper. All of it is dropped when [`Server::run`]
/// returns.
pub struct Server {
    listener: TcpListener,
    state: AppState<SystemEnv>,
    env: SystemEnv,
    sweep_interval: Duration,
}

impl Server {
    /// Validate the configuration and bind the listener.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let env = SystemEnv::new();
        let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Transport(format!("failed to bind {}: {e}", config.bind_address))
        })?;

        let store = MessageStore::new(env.clone(), config.store);
        let limiter = RateLimiter::new(env.clone(), config.rate_limit);
        let state = AppState::new(Relay::new(store), limiter);

        Ok(Self { listener, state, env, sweep_interval: config.sweep_interval })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then drain in-flight requests and stop
    /// the sweeper.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Server starting on {}", self.local_addr()?);

        let sweeper =
            Sweeper::spawn(self.state.relay().store().clone(), self.env, self.sweep_interval);

        let app = http::router(self.state);
        let served = axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        let passes = sweeper.shutdown().await?;
        tracing::info!(sweep_passes = passes, "Server stopped");

        Ok(served?)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
