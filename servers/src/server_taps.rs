//! # Keg Tap Ledger Server
//!
//! The central server of the keg tap system. It holds beer metadata and the
//! authoritative remaining volume of every tap, answers device polls and applies
//! pour reports.
//!
//! ## Key Features:
//! - **Atomic Volume Ledger**: Each pour is one conditional `UPDATE` in SQLite, so
//!   concurrent reports for the same tap never lose a decrement.
//! - **Idempotent Stop Reports**: Reports carrying a `report_id` are applied at most once.
//! - **Layered Configuration**: Defaults, `server_taps.conf`, `.env`, environment
//!   variables and CLI flags, via `clap` and `dotenvy`.
//! - **Structured Logging**: Console plus daily rotated JSON files through `tracing`.
//! - **Graceful Shutdown**: In-flight requests drain on Ctrl-C / SIGTERM through
//!   `tokio-graceful`, bounded to ten seconds.

use std::time::Duration;

use anyhow::Result;
use lib_kegtap::{connections::Database, loggers::setup_logging};
use servers::taps_logic::{self, AppState, config};
use tokio::net::TcpListener;
use tokio_graceful::Shutdown;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Phase 1: Configuration & Logging ---
    let config = config::load_config()?;
    let _log_guard = setup_logging("server_taps", &config.log_dir(), config.log_level())?;
    info!(
        port = config.port(),
        database_url = config.database_url(),
        image_dir = %config.image_dir().display(),
        "Configuration loaded"
    );

    // --- Phase 2: Ledger Store ---
    let db = Database::connect(config.database_url(), config.max_connections()).await?;
    let state = AppState::new(db.clone(), config.image_dir());
    let app = taps_logic::router(state);

    // --- Phase 3: Serve until a shutdown signal ---
    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Keg tap server listening on http://{}", addr);

    let shutdown = Shutdown::default();
    shutdown.spawn_task_fn(move |guard| async move {
        let signal = guard.clone();
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await
        {
            error!("HTTP server error: {}", e);
        }
        drop(guard);
    });

    match shutdown.shutdown_with_limit(Duration::from_secs(10)).await {
        Ok(elapsed) => info!(
            "shutdown: gracefully {}s after shutdown signal received",
            elapsed.as_secs_f64()
        ),
        Err(e) => warn!("shutdown: forcefully due to timeout: {}", e),
    }

    db.close().await;
    Ok(())
}
