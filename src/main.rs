//! Hookbin server binary
//!
//! Runs the capture and inspection HTTP service over an in-memory bounded
//! history store, with an optional periodic retention sweep.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookbin_api::{ApiServer, ApiServerConfig};
use hookbin_store::HistoryStore;

/// Hookbin - capture webhooks at disposable endpoints and inspect them
#[derive(Parser, Debug)]
#[command(name = "hookbin")]
#[command(about = "Disposable webhook capture and inspection server", long_about = None)]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
struct Cli {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Public base URL used in generated capture URLs
    /// (e.g. "https://hooks.example.com"); defaults to the bind address
    #[arg(long, env = "HOOKBIN_PUBLIC_URL")]
    public_url: Option<String>,

    /// Maximum events retained per endpoint
    #[arg(long, default_value = "100")]
    capacity: usize,

    /// Remove endpoints older than this many hours (no sweep when unset)
    #[arg(long, env = "HOOKBIN_RETENTION_HOURS")]
    retention_hours: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    info!("Starting hookbin");
    info!("Per-endpoint history cap: {}", cli.capacity);

    let store = Arc::new(HistoryStore::with_capacity(cli.capacity));

    if let Some(hours) = cli.retention_hours {
        spawn_retention_sweep(store.clone(), hours);
    }

    let config = ApiServerConfig {
        bind_addr: cli.bind,
        enable_cors: !cli.no_cors,
        public_base_url: cli.public_url,
    };

    let server = ApiServer::new(config, store);
    server.start().await
}

/// Periodically drop endpoints older than the retention horizon.
///
/// A swept endpoint re-provisions on its next capture, so the sweep only
/// reclaims memory; it never makes an id permanently unusable.
fn spawn_retention_sweep(store: Arc<HistoryStore>, hours: i64) {
    if hours <= 0 {
        warn!("Ignoring non-positive retention horizon: {}h", hours);
        return;
    }

    info!("Retention sweep enabled: endpoints expire after {}h", hours);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        // The immediate first tick is harmless against an empty store
        loop {
            interval.tick().await;
            let removed = store.sweep_expired(chrono::Duration::hours(hours));
            if removed > 0 {
                info!("Retention sweep removed {} expired endpoints", removed);
            }
        }
    });
}
