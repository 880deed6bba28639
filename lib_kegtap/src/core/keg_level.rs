//! # Keg Level
//!
//! Turns a tap's remaining volume into the figures a device shows: a whole-number
//! percentage and a bar of coloured LEDs.

use serde::{Deserialize, Serialize};

/// Default number of LEDs in the level bar.
pub const LED_COUNT: usize = 8;

/// Colour of one LED in the keg level bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    /// Not lit.
    Off,
    /// Bottom quarter of the bar (red).
    Low,
    /// Middle half of the bar (yellow).
    Medium,
    /// Top quarter of the bar (green).
    Full,
}

impl LedColor {
    /// RGB triple for this colour.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            LedColor::Off => (0, 0, 0),
            LedColor::Low => (255, 0, 0),
            LedColor::Medium => (255, 255, 0),
            LedColor::Full => (0, 255, 0),
        }
    }
}

/// Device-wide status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    /// Server unreachable or another error (red).
    Error,
    /// Fetching data (yellow).
    Loading,
    /// Last refresh succeeded (green).
    Ok,
}

impl StatusColor {
    /// RGB triple for this status.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            StatusColor::Error => (255, 0, 0),
            StatusColor::Loading => (255, 255, 0),
            StatusColor::Ok => (0, 255, 0),
        }
    }
}

/// Whole-number percentage of `full_volume` still in the keg, capped at 100.
pub fn remaining_percent(volume: f64, full_volume: f64) -> u8 {
    if volume <= 0.0 || full_volume <= 0.0 || !volume.is_finite() {
        return 0;
    }
    // `as` saturates, and the min() caps kegs reported above their full volume.
    ((volume / full_volume * 100.0) as u32).min(100) as u8
}

/// Colours for a bar of `led_count` LEDs showing `percent`.
///
/// The lit LEDs take the colour of their position in the bar, so a full keg shows
/// red, yellow and green bands and a nearly empty one only red.
pub fn level_bar(percent: u8, led_count: usize) -> Vec<LedColor> {
    if led_count == 0 {
        return Vec::new();
    }
    let lit = (f64::from(percent.min(100)) / 100.0 * led_count as f64) as usize;
    (0..led_count)
        .map(|i| {
            if i >= lit {
                return LedColor::Off;
            }
            let position = (i + 1) as f64 / led_count as f64 * 100.0;
            if position <= 25.0 {
                LedColor::Low
            } else if position <= 75.0 {
                LedColor::Medium
            } else {
                LedColor::Full
            }
        })
        .collect()
}
