//! # Keg Tap Monitor
//!
//! Watches one tap's flow sensor, reports pours to the tap server and shows the
//! beer and keg level on the local display.
//!
//! ## Key Features:
//! - **Pour Detection**: Threshold-per-window detection with a single-shot start
//!   signal from the edge handler.
//! - **Decoupled Reporting**: Network calls run on their own task, fed by a queue.
//! - **Idempotent Stop Reports**: Every stop carries a fresh `report_id`, so the
//!   transport may retry it safely.
//! - **Layered Configuration**: Defaults, `tap_monitor.conf`, `.env`, `TAP_*`
//!   environment variables and CLI flags.

use std::sync::Arc;

use anyhow::{Context, Result};
use device::monitor_logic::display::{ConsoleDisplay, DisplaySink, shared};
use device::monitor_logic::poller::PollerSettings;
use device::monitor_logic::sensor::{self, EdgeHandler};
use device::monitor_logic::{self, config, flow_task, poller, reporter};
use lib_kegtap::core::{FlowStateMachine, PulseCounter};
use lib_kegtap::loggers::setup_logging;
use lib_kegtap::retrieve::TapApi;
use tokio::signal;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{error, info};

/// Capacity of the queue between the flow task and the reporter.
const EVENT_QUEUE: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Phase 1: Configuration & Logging ---
    let config = config::load_config()?;
    let _log_guard = setup_logging("tap_monitor", &config.log_dir(), config.log_level())?;
    let script = config.pulse_script()?;
    info!(
        tap_id = config.tap_id(),
        server_url = config.server_url(),
        threshold = config.flow_detection_threshold(),
        window_ms = config.flow_timeout().as_millis() as u64,
        "Configuration loaded"
    );

    // --- Phase 2: Hardware ---
    let (width, height) = config.display_size();
    let mut console = ConsoleDisplay::new(width, height);
    if let Err(e) = console.init() {
        error!("Display initialization failed: {:#}", e);
        return Err(e.context("Display initialization failed"));
    }
    let display = shared(console);

    let service = Arc::new(
        TapApi::new(config.server_url(), config.client_options())
            .context("Failed to build tap server client")?,
    );

    // --- Phase 3: Tasks ---
    let (shutdown_tx, _) = broadcast::channel(1);
    let counter = Arc::new(PulseCounter::new(config.flow_detection_threshold()));
    let (threshold_tx, threshold_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    let refresh = Arc::new(Notify::new());
    let edges = EdgeHandler::new(counter.clone(), threshold_tx);

    let flow_handle = tokio::spawn(flow_task::run(
        FlowStateMachine::new(counter, config.flow_timeout()),
        threshold_rx,
        event_tx,
        shutdown_tx.subscribe(),
    ));

    let reporter_handle = tokio::spawn(reporter::run(
        service.clone(),
        config.tap_id().to_string(),
        event_rx,
        display.clone(),
        refresh.clone(),
    ));

    let poller_handle = tokio::spawn(poller::run(
        service,
        PollerSettings {
            tap_id: config.tap_id().to_string(),
            interval: config.refresh_interval(),
            led_count: config.led_count(),
            image_size: Some((width, height)),
        },
        display,
        refresh,
        shutdown_tx.subscribe(),
    ));

    if let Some(script) = script {
        tokio::spawn(sensor::simulate(script, edges.clone(), shutdown_tx.subscribe()));
    } else {
        info!("No pulse source configured; waiting for shutdown");
    }

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        error!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // The flow task closes the event queue on exit, which lets the reporter
    // deliver what is left and stop.
    let _ = shutdown_tx.send(());
    drop(edges);
    let failed = monitor_logic::join_tasks(vec![
        ("flow", flow_handle),
        ("reporter", reporter_handle),
        ("poller", poller_handle),
    ])
    .await;
    if failed > 0 {
        anyhow::bail!("{failed} monitor task(s) failed");
    }

    info!("Shutdown complete.");
    Ok(())
}
