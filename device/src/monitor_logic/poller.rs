//! # Tap Poller
//!
//! Periodically asks the server what is on this tap and redraws the display. A
//! refresh also runs right after the reporter delivers a stop.

use std::sync::Arc;
use std::time::Duration;

use lib_kegtap::core::StatusColor;
use lib_kegtap::core::keg_level::{level_bar, remaining_percent};
use tokio::sync::{Notify, broadcast};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::display::SharedDisplay;
use super::service::TapService;

/// Shown when the tap info could not be fetched.
pub const FETCH_FAILED: &str = "Error fetching tap info";

/// Settings for the poller.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub tap_id: String,
    pub interval: Duration,
    pub led_count: usize,
    /// Size to request the beer image at; `None` fetches it as stored.
    pub image_size: Option<(u32, u32)>,
}

/// One refresh: loading status, fetch, then either the tap or an error.
///
/// When the beer has an image it is downloaded too; a failed download is logged and
/// the tap is shown without it. Returns whether the tap info fetch succeeded.
pub async fn refresh_once<S: TapService>(
    service: &S,
    settings: &PollerSettings,
    display: &SharedDisplay,
) -> bool {
    display.lock().await.show_status(StatusColor::Loading);

    let result = service.fetch_tap_info(&settings.tap_id).await;
    let image = match &result {
        Ok(info) if info.image_path.is_some() => {
            match service
                .fetch_tap_image(&settings.tap_id, settings.image_size)
                .await
            {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(tap_id = %settings.tap_id, error = %e, "Beer image download failed");
                    None
                }
            }
        }
        _ => None,
    };

    let mut display = display.lock().await;
    match result {
        Ok(info) => {
            let percent = remaining_percent(info.volume, info.full_volume);
            let level = level_bar(percent, settings.led_count);
            debug!(tap_id = %info.tap_id, volume = info.volume, percent, "Tap refreshed");
            if let Some(image) = image {
                display.show_image(&image);
            }
            display.show_tap(&info, percent, &level);
            display.show_status(StatusColor::Ok);
            true
        }
        Err(e) => {
            warn!(tap_id = %settings.tap_id, error = %e, "Tap refresh failed");
            display.show_status(StatusColor::Error);
            display.show_message(FETCH_FAILED);
            false
        }
    }
}

/// Refreshes on every interval tick (the first one immediately) and whenever
/// `refresh` is notified, until shutdown.
pub async fn run<S: TapService>(
    service: Arc<S>,
    settings: PollerSettings,
    display: SharedDisplay,
    refresh: Arc<Notify>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        tap_id = %settings.tap_id,
        interval_secs = settings.interval.as_secs(),
        "Poller started"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Poller shutting down");
                break;
            }
            _ = ticker.tick() => {}
            _ = refresh.notified() => {
                // Pushes the next periodic refresh a full interval out.
                ticker.reset();
            }
        }
        refresh_once(service.as_ref(), &settings, &display).await;
    }
}
