//! Delivers queued pour events to the server, one at a time and in order.

use std::sync::Arc;

use lib_kegtap::core::StatusColor;
use lib_kegtap::models::PourEvent;
use tokio::sync::{Notify, mpsc};
use tracing::{info, warn};

use super::display::SharedDisplay;
use super::service::TapService;

/// Shown when the server did not accept a pour report.
pub const REPORT_FAILED: &str = "Pour report failed";

/// Drains `events` until the flow task closes the queue.
///
/// A failed report is not retried here; the transport has already retried it.
/// After an accepted stop the poller is woken so the new level shows at once.
pub async fn run<S: TapService>(
    service: Arc<S>,
    tap_id: String,
    mut events: mpsc::Receiver<PourEvent>,
    display: SharedDisplay,
    refresh: Arc<Notify>,
) {
    while let Some(event) = events.recv().await {
        let accepted = service.report_pour_event(&tap_id, &event).await;
        if !accepted {
            warn!(tap_id, event = event.kind(), "Server rejected or missed pour report");
            let mut display = display.lock().await;
            display.show_status(StatusColor::Error);
            display.show_message(REPORT_FAILED);
            continue;
        }
        if let PourEvent::Stop { duration_secs, .. } = event {
            info!(tap_id, duration_secs, "Pour recorded");
            refresh.notify_one();
        }
    }
    info!("Reporter finished");
}
