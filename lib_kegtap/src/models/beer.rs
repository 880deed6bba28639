use serde::{Deserialize, Serialize};

use crate::errors::{TapError, TapResult};

/// A beer that can be assigned to taps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beer {
    /// Internal row id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Alcohol by volume, in percent.
    pub abv: f64,
    /// Image file name relative to the server's image directory.
    pub image_path: Option<String>,
}

/// Fields supplied when adding or editing a beer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeerInput {
    pub name: String,
    pub abv: f64,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl BeerInput {
    /// Trims the name and checks the ABV range.
    pub fn validated(mut self) -> TapResult<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(TapError::invalid("Missing name parameter"));
        }
        if !self.abv.is_finite() || !(0.0..=100.0).contains(&self.abv) {
            return Err(TapError::invalid("Invalid abv"));
        }
        // A blank upload field means "no image".
        self.image_path = self
            .image_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok(self)
    }
}
