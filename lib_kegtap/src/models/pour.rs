use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::ledger::{validate_duration, PourOutcome};
use crate::errors::{TapError, TapResult};

/// Longest accepted `report_id`.
const MAX_REPORT_ID_LEN: usize = 128;

/// A pour notification sent by a device.
#[derive(Debug, Clone, PartialEq)]
pub enum PourEvent {
    /// Flow was detected. Acknowledged only; no accounting happens until the stop.
    Start,
    /// Flow ended after `duration_secs`.
    Stop {
        duration_secs: f64,
        /// Identifier unique to this pour; replays with the same id are not re-applied.
        report_id: Option<String>,
    },
}

impl PourEvent {
    /// Parses a `pour_event` request body.
    ///
    /// Accepts `duration` as a JSON number or a numeric string. A `null` field is
    /// treated as missing.
    pub fn from_json(body: &Value) -> TapResult<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| TapError::invalid("Missing event_type parameter"))?;
        let event_type = present(obj, "event_type")
            .ok_or_else(|| TapError::invalid("Missing event_type parameter"))?;

        match event_type.as_str() {
            Some("start") => Ok(PourEvent::Start),
            Some("stop") => {
                let raw = present(obj, "duration").ok_or_else(|| {
                    TapError::invalid("Missing duration parameter for stop event")
                })?;
                let duration_secs = seconds(raw, "duration")?;
                let report_id = match present(obj, "report_id") {
                    None => None,
                    Some(Value::String(id))
                        if !id.trim().is_empty() && id.len() <= MAX_REPORT_ID_LEN =>
                    {
                        Some(id.trim().to_string())
                    }
                    Some(_) => return Err(TapError::invalid("Invalid report_id")),
                };
                Ok(PourEvent::Stop {
                    duration_secs,
                    report_id,
                })
            }
            _ => Err(TapError::invalid("Invalid event_type")),
        }
    }

    /// The request body a device sends for this event.
    pub fn to_json(&self) -> Value {
        match self {
            PourEvent::Start => json!({ "event_type": "start" }),
            PourEvent::Stop {
                duration_secs,
                report_id: Some(id),
            } => json!({ "event_type": "stop", "duration": duration_secs, "report_id": id }),
            PourEvent::Stop {
                duration_secs,
                report_id: None,
            } => json!({ "event_type": "stop", "duration": duration_secs }),
        }
    }

    /// `"start"` or `"stop"`, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            PourEvent::Start => "start",
            PourEvent::Stop { .. } => "stop",
        }
    }
}

/// Parses the `pour_time` field of an `update_volume` body.
pub fn parse_pour_time(body: &Value) -> TapResult<f64> {
    let raw = body
        .as_object()
        .and_then(|obj| present(obj, "pour_time"))
        .ok_or_else(|| TapError::invalid("Missing pour_time parameter"))?;
    seconds(raw, "pour_time")
}

/// Parses the `volume` field of a `set_volume` body.
pub fn parse_volume(body: &Value) -> TapResult<f64> {
    let raw = body
        .as_object()
        .and_then(|obj| present(obj, "volume"))
        .ok_or_else(|| TapError::invalid("Missing volume parameter"))?;
    number(raw).ok_or_else(|| TapError::invalid("Invalid volume"))
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn seconds(raw: &Value, field: &str) -> TapResult<f64> {
    let value = number(raw).ok_or_else(|| TapError::invalid(format!("Invalid {field}")))?;
    validate_duration(value, field)
}

/// What the ledger did with a stop report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PourReceipt {
    pub outcome: PourOutcome,
    /// `true` when the report id had already been applied and nothing changed.
    pub duplicate: bool,
}

/// Body of a successful `pour_event` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PourEventAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_poured: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl PourEventAck {
    /// Acknowledgement of a start event.
    pub fn started() -> Self {
        Self {
            success: true,
            volume_poured: None,
            new_volume: None,
            duplicate: false,
        }
    }

    /// Acknowledgement of an applied (or replayed) stop event.
    pub fn stopped(receipt: PourReceipt) -> Self {
        Self {
            success: true,
            volume_poured: Some(receipt.outcome.volume_poured),
            new_volume: Some(receipt.outcome.new_volume),
            duplicate: receipt.duplicate,
        }
    }
}

/// Body of a successful `update_volume` or `set_volume` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAck {
    pub success: bool,
    pub new_volume: f64,
}
