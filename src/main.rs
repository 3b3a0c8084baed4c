//! Application entry point for the `agrigrid-edge` field gateway.
//!
//! This binary orchestrates the full startup sequence for the edge grid
//! processor, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the local SQLite cache (fatal if this fails — there is no safe
//!   mode of operation without local durability)
//! - Creating the local cache schema if it does not exist
//! - Building the remote store client and probing initial reachability
//! - Handing control to the cooperative compute/sync scheduler
//!
//! # Environment Variables
//! - `FIELD_ID`, `FIELD_MIN_LAT`/`FIELD_MAX_LAT`/`FIELD_MIN_LON`/`FIELD_MAX_LON`
//!   (**required**) – field identity and bounding extent
//! - `REMOTE_API_URL` (**required**) – remote store API base URL
//! - `LOCAL_CACHE_DB` (**required**) – local SQLite cache path
//! - `EDGE_DEVICE_ID` (**required**) – stable device identifier
//! - `EDGE_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `EDGE_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the remaining tunables and their defaults.

use std::{env, io::IsTerminal};

use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod grid;
mod interpolate;
mod metrics;
mod models;
mod readings;
mod remote;
mod scheduler;
mod schema;
mod state;
mod storage;
mod sync;

use remote::{HttpRemoteStore, RemoteStore};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Opening local cache: {}", cfg.local_cache_db);

    // Fatal on failure: the device cannot operate without its local cache
    let local = storage::LocalCache::open(&cfg.local_cache_db).await?;
    schema::create_schema(local.pool()).await?;

    tracing::info!(
        "Local cache ready ({} grid points on disk)",
        local.grid_point_count().await?
    );

    let remote = HttpRemoteStore::new(
        &cfg.remote_api_url,
        cfg.remote_timeout(),
        cfg.api_max_pages,
    )?;

    // Initial connectivity is whatever the first probe says; the sync cycle
    // keeps it current from here on
    let initially_online = match remote.ping().await {
        Ok(()) => {
            tracing::info!("Remote store reachable, starting online");
            true
        }
        Err(e) => {
            tracing::warn!("Remote store unreachable at startup, starting offline: {:#}", e);
            false
        }
    };

    let mut scheduler = scheduler::Scheduler::new(cfg, local, remote, initially_online);
    scheduler.run().await;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `EDGE_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `EDGE_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("EDGE_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to EDGE_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("EDGE_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
