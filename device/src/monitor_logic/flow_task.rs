//! # Flow Task
//!
//! Owns the [`FlowStateMachine`]. Threshold crossings arrive from the edge handler;
//! a ticker fires once per window. Transitions are turned into [`PourEvent`]s and
//! queued for the reporter, so no network call ever runs on this task.

use std::time::Instant;

use lib_kegtap::core::{FlowEvent, FlowStateMachine};
use lib_kegtap::models::PourEvent;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The event to report for a transition. Every stop gets a fresh `report_id`.
pub fn to_pour_event(event: FlowEvent) -> PourEvent {
    match event {
        FlowEvent::Started => PourEvent::Start,
        FlowEvent::Stopped { duration_secs } => PourEvent::Stop {
            duration_secs,
            report_id: Some(Uuid::new_v4().to_string()),
        },
    }
}

/// Runs the detector until shutdown or until the edge handler goes away.
pub async fn run(
    mut machine: FlowStateMachine,
    mut thresholds: mpsc::UnboundedReceiver<Instant>,
    events: mpsc::Sender<PourEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let window = machine.window();
    let mut ticker = time::interval_at(time::Instant::now() + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(window_ms = window.as_millis() as u64, "Flow task started");
    loop {
        let transition = tokio::select! {
            _ = shutdown.recv() => {
                info!("Flow task shutting down");
                break;
            }
            crossing = thresholds.recv() => {
                let Some(at) = crossing else {
                    debug!("Edge handler gone, flow task exiting");
                    break;
                };
                let started = machine.on_threshold(at);
                if started.is_some() {
                    // The first window of a pour is measured from its start.
                    ticker.reset();
                }
                started
            }
            tick = ticker.tick() => machine.on_window_elapsed(tick.into_std()),
        };

        let Some(transition) = transition else {
            continue;
        };
        let event = to_pour_event(transition);
        info!(event = event.kind(), ?event, "Pour transition");
        // A full queue means the reporter is stuck; dropping keeps detection live.
        if let Err(e) = events.try_send(event) {
            warn!(error = %e, "Pour event dropped");
        }
    }
}
