//! # Tap API Client
//!
//! The device's view of the tap server. Wraps [`ApiClient`] with the calls a device
//! makes: polling its tap, downloading the beer image and reporting pour events.
//!
//! Stop reports are retried by the transport middleware on transient failures. That
//! is safe because each stop carries a `report_id` the server deduplicates on.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::ky_http::{ApiClient, ClientOptions};
use crate::errors::{TapError, TapResult};
use crate::models::{PourEvent, PourEventAck, TapInfo};

/// Typed client for the tap REST surface.
#[derive(Clone)]
pub struct TapApi {
    client: ApiClient,
}

/// Pulls the `error` field out of a JSON error body, falling back to the raw text.
fn error_message(body: Option<String>, status: u16) -> String {
    body.as_deref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .or(body)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn transport(e: anyhow::Error) -> TapError {
    TapError::TransientNetwork(format!("{e:#}"))
}

impl TapApi {
    /// Builds a client for the server at `server_url`.
    pub fn new(server_url: &str, options: ClientOptions) -> TapResult<Self> {
        let client =
            ApiClient::new(server_url, options).map_err(|e| TapError::invalid(format!("{e:#}")))?;
        Ok(Self { client })
    }

    /// Current beer and volume figures for `tap_id`.
    ///
    /// A 404 becomes `NotFound`; everything else that is not a 200 becomes
    /// `TransientNetwork`.
    pub async fn fetch_tap_info(&self, tap_id: &str) -> TapResult<TapInfo> {
        let url = self.client.endpoint(&["api", "tap", tap_id]);
        let response = self
            .client
            .request::<TapInfo, ()>(Method::GET, url, None)
            .await
            .map_err(transport)?;

        match (response.status, response.data) {
            (200, Some(info)) => Ok(info),
            (404, _) => Err(TapError::NotFound(error_message(response.error_body, 404))),
            (status, _) => Err(TapError::TransientNetwork(error_message(
                response.error_body,
                status,
            ))),
        }
    }

    /// Downloads the image of the beer on `tap_id`.
    ///
    /// With a `size`, the image is first requested scaled to `(width, height)`; if
    /// that attempt fails for any reason the image is fetched as stored.
    pub async fn fetch_tap_image(&self, tap_id: &str, size: Option<(u32, u32)>) -> TapResult<Vec<u8>> {
        let url = self.client.endpoint(&["api", "tap", tap_id, "image"]);

        if let Some((width, height)) = size {
            let mut sized = url.clone();
            sized
                .query_pairs_mut()
                .append_pair("width", &width.to_string())
                .append_pair("height", &height.to_string());
            match self.client.fetch_bytes(sized).await {
                Ok(response) if response.status == 200 => {
                    if let Some(bytes) = response.data {
                        return Ok(bytes);
                    }
                }
                Ok(response) => {
                    debug!(tap_id, status = response.status, "Sized image unavailable, fetching as stored")
                }
                Err(e) => debug!(tap_id, error = %e, "Sized image request failed, fetching as stored"),
            }
        }

        let response = self.client.fetch_bytes(url).await.map_err(transport)?;
        match (response.status, response.data) {
            (200, Some(bytes)) => Ok(bytes),
            (404, _) => Err(TapError::NotFound(error_message(response.error_body, 404))),
            (status, _) => Err(TapError::TransientNetwork(error_message(
                response.error_body,
                status,
            ))),
        }
    }

    /// Sends one pour event and returns the server's acknowledgement.
    pub async fn send_pour_event(&self, tap_id: &str, event: &PourEvent) -> TapResult<PourEventAck> {
        let url = self.client.endpoint(&["api", "tap", tap_id, "pour_event"]);
        let response = self
            .client
            .request::<PourEventAck, Value>(Method::POST, url, Some(event.to_json()))
            .await
            .map_err(transport)?;

        match (response.status, response.data) {
            (200, Some(ack)) => Ok(ack),
            (404, _) => Err(TapError::NotFound(error_message(response.error_body, 404))),
            (400, _) => Err(TapError::InvalidRequest(error_message(response.error_body, 400))),
            (status, _) => Err(TapError::TransientNetwork(error_message(
                response.error_body,
                status,
            ))),
        }
    }

    /// Reports a pour event. `true` only when the server answered 200.
    ///
    /// Failures are logged here and otherwise swallowed.
    pub async fn report_pour_event(&self, tap_id: &str, event: &PourEvent) -> bool {
        match self.send_pour_event(tap_id, event).await {
            Ok(ack) => {
                debug!(tap_id, event = event.kind(), ?ack, "Pour event reported");
                true
            }
            Err(e) => {
                warn!(tap_id, event = event.kind(), error = %e, "Pour event not delivered");
                false
            }
        }
    }
}
