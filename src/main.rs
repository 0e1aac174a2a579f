//! Glimpse Capture Engine
//!
//! Self-hosted behavioral analytics backend handling:
//! - SDK interaction ingestion with validation and self-traffic filtering
//! - Session replay assembly from chunk uploads
//! - On-demand aggregation: heatmaps, attention bands, funnels
//! - Rage/dead click anomaly detection
//! - Realtime relay for live session mirroring

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use analytics::QueryBudget;
use api::{router, AppState, RateLimitConfig};
use event_store::{EventStore, MemoryStore};
use realtime::Hub;
use telemetry::{health, init_tracing_from_env, metrics};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Role-lookup service URL; empty or "mock" enables deterministic
    /// mock answers.
    #[serde(default)]
    role_url: String,

    /// Days of interaction history kept by the retention sweep.
    #[serde(default = "default_retention_days")]
    retention_days: i64,

    /// Sustained ingest events per second per project/session key.
    #[serde(default = "default_rate")]
    rate_limit_per_sec: u32,

    /// Burst capacity per project/session key.
    #[serde(default = "default_burst")]
    rate_limit_burst: u32,

    /// Hard time budget for aggregation compute, seconds.
    #[serde(default = "default_query_budget_secs")]
    query_budget_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_retention_days() -> i64 {
    90
}

fn default_rate() -> u32 {
    RateLimitConfig::default().rate
}

fn default_burst() -> u32 {
    RateLimitConfig::default().burst
}

fn default_query_budget_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            role_url: String::new(),
            retention_days: default_retention_days(),
            rate_limit_per_sec: default_rate(),
            rate_limit_burst: default_burst(),
            query_budget_secs: default_query_budget_secs(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Glimpse Capture Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        retention_days = config.retention_days,
        role_url = %if config.role_url.is_empty() { "mock" } else { &config.role_url },
        "Loaded configuration"
    );

    let store: Arc<dyn EventStore> = Arc::new(MemoryStore::new());
    let hub = Arc::new(Hub::new());

    let mut state = AppState::with_rate_limit(
        store.clone(),
        hub,
        &config.role_url,
        RateLimitConfig {
            rate: config.rate_limit_per_sec,
            burst: config.rate_limit_burst,
        },
    );
    state.budget = QueryBudget::new(Duration::from_secs(config.query_budget_secs));

    health().store.set_healthy();
    health().relay.set_healthy();

    // Background maintenance
    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();
    let _retention_sweep = start_retention_sweep(store.clone(), config.retention_days);
    let _metrics_log = start_metrics_log();

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CAPTURE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Hourly sweep dropping interactions past the retention horizon.
fn start_retention_sweep(
    store: Arc<dyn EventStore>,
    retention_days: i64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            let cutoff = chrono::Utc::now() - chrono::Duration::days(retention_days);
            match store.sweep_expired(cutoff).await {
                Ok(0) => {}
                Ok(removed) => {
                    metrics().interactions_swept.inc_by(removed as u64);
                    info!(removed = removed, "Retention sweep completed");
                }
                Err(e) => warn!(error = %e, "Retention sweep failed"),
            }
        }
    })
}

/// Periodic metrics snapshot log.
fn start_metrics_log() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        // Skip the immediate first tick.
        interval.tick().await;
        loop {
            interval.tick().await;
            let snapshot = metrics().snapshot();
            info!(
                interactions_received = snapshot.interactions_received,
                interactions_persisted = snapshot.interactions_persisted,
                interactions_filtered = snapshot.interactions_filtered,
                chunks_received = snapshot.chunks_received,
                notifications_published = snapshot.notifications_published,
                relay_connections = snapshot.active_relay_connections,
                ingest_latency_mean_ms = snapshot.ingest_latency_mean_ms,
                "Metrics snapshot"
            );
        }
    })
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
