use serde::{Deserialize, Serialize};

use crate::core::ledger::validate_tap_levels;
use crate::errors::{TapError, TapResult};

/// A tap row joined with the name of its beer, as listed by the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    /// Internal row id.
    pub id: i64,
    /// External identifier devices use (e.g. `tap_1`).
    pub tap_id: String,
    /// Assigned beer, if any.
    pub beer_id: Option<i64>,
    /// Name of the assigned beer, if any.
    pub beer_name: Option<String>,
    /// Remaining volume in mL.
    pub volume: f64,
    /// Volume of a fresh keg in mL; the 100% reference.
    pub full_volume: f64,
    /// Calibrated flow rate in mL/s.
    pub flow_rate: f64,
}

/// The answer to "what is on tap X right now", as served to devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapInfo {
    pub tap_id: String,
    pub beer_name: Option<String>,
    pub beer_abv: Option<f64>,
    pub volume: f64,
    pub full_volume: f64,
    pub flow_rate: f64,
    pub image_path: Option<String>,
}

/// Fields supplied when adding a tap. `full_volume` is taken from `volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTap {
    pub tap_id: String,
    #[serde(default)]
    pub beer_id: Option<i64>,
    pub volume: f64,
    pub flow_rate: f64,
}

impl NewTap {
    /// Trims the identifier and checks the volume figures.
    pub fn validated(mut self) -> TapResult<Self> {
        self.tap_id = self.tap_id.trim().to_string();
        if self.tap_id.is_empty() {
            return Err(TapError::invalid("Missing tap_id parameter"));
        }
        validate_tap_levels(self.volume, self.volume, self.flow_rate)?;
        Ok(self)
    }
}

/// Fields supplied when editing a tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapUpdate {
    #[serde(default)]
    pub beer_id: Option<i64>,
    pub volume: f64,
    pub full_volume: f64,
    pub flow_rate: f64,
}

impl TapUpdate {
    /// Rejects negative figures and a volume above the full volume.
    pub fn validated(self) -> TapResult<Self> {
        validate_tap_levels(self.volume, self.full_volume, self.flow_rate)?;
        Ok(self)
    }
}
