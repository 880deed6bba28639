//! The seam between the device runtime and the tap server.

use std::future::Future;

use lib_kegtap::TapResult;
use lib_kegtap::models::{PourEvent, TapInfo};
use lib_kegtap::retrieve::TapApi;

/// What the poller and the reporter need from the server.
pub trait TapService: Send + Sync + 'static {
    fn fetch_tap_info(&self, tap_id: &str) -> impl Future<Output = TapResult<TapInfo>> + Send;

    /// Image bytes of the beer on `tap_id`, scaled to `size` when the server can.
    fn fetch_tap_image(
        &self,
        tap_id: &str,
        size: Option<(u32, u32)>,
    ) -> impl Future<Output = TapResult<Vec<u8>>> + Send;

    /// `true` only when the server accepted the event.
    fn report_pour_event(
        &self,
        tap_id: &str,
        event: &PourEvent,
    ) -> impl Future<Output = bool> + Send;
}

impl TapService for TapApi {
    fn fetch_tap_info(&self, tap_id: &str) -> impl Future<Output = TapResult<TapInfo>> + Send {
        TapApi::fetch_tap_info(self, tap_id)
    }

    fn fetch_tap_image(
        &self,
        tap_id: &str,
        size: Option<(u32, u32)>,
    ) -> impl Future<Output = TapResult<Vec<u8>>> + Send {
        TapApi::fetch_tap_image(self, tap_id, size)
    }

    fn report_pour_event(
        &self,
        tap_id: &str,
        event: &PourEvent,
    ) -> impl Future<Output = bool> + Send {
        TapApi::report_pour_event(self, tap_id, event)
    }
}
