//! # Tap Monitor Logic
//!
//! The runtime of one tap device.
//!
//! ## Tasks:
//! - **Edge handler** (`sensor`): counts flow sensor edges and signals the first
//!   threshold crossing of each pour. On a host a scripted simulator feeds it.
//! - **Flow task** (`flow_task`): owns the pour detector, checks one window at a
//!   time and queues start/stop events.
//! - **Reporter** (`reporter`): sends queued events to the server in order.
//! - **Poller** (`poller`): refreshes the displayed tap info on a timer and after
//!   every recorded pour.
//!
//! The tasks share nothing but the pulse counter, two channels, a `Notify` and the
//! display, and all of them stop on the same broadcast shutdown signal.

pub mod config;
pub mod display;
pub mod flow_task;
pub mod poller;
pub mod reporter;
pub mod sensor;
pub mod service;

use tokio::task::JoinHandle;
use tracing::error;

/// Waits for every task to finish and logs the ones that panicked or were
/// cancelled. Returns how many failed.
pub async fn join_tasks(tasks: Vec<(&'static str, JoinHandle<()>)>) -> usize {
    let mut failed = 0;
    for (name, handle) in tasks {
        if let Err(e) = handle.await {
            error!(task = name, "Monitor task failed: {}", e);
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_tasks_reports_panics() {
        let ok = tokio::spawn(async {});
        let broken = tokio::spawn(async { panic!("display driver crashed") });
        assert_eq!(join_tasks(vec![("ok", ok), ("broken", broken)]).await, 1);
    }
}
