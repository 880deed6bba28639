//! # Volume Ledger Arithmetic
//!
//! Pure functions behind every volume mutation. The store applies the same formula
//! inside a single SQL statement, and these functions are the reference it is tested
//! against.

use serde::{Deserialize, Serialize};

use crate::errors::{TapError, TapResult};

/// Result of applying one pour to a tap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PourOutcome {
    /// Millilitres dispensed: `duration * flow_rate`, unrounded.
    pub volume_poured: f64,
    /// Remaining volume after the pour, never below zero.
    pub new_volume: f64,
}

/// Applies a pour of `duration_secs` at `flow_rate` mL/s to `volume`.
pub fn apply_pour(volume: f64, flow_rate: f64, duration_secs: f64) -> PourOutcome {
    let volume_poured = duration_secs * flow_rate;
    PourOutcome {
        volume_poured,
        new_volume: clamp_at_zero(volume - volume_poured),
    }
}

/// The lower bound every stored volume respects.
pub fn clamp_at_zero(volume: f64) -> f64 {
    volume.max(0.0)
}

/// Validates a pour duration (seconds). `field` names the request field in errors.
pub fn validate_duration(duration_secs: f64, field: &str) -> TapResult<f64> {
    if duration_secs.is_finite() && duration_secs >= 0.0 {
        Ok(duration_secs)
    } else {
        Err(TapError::invalid(format!("Invalid {field}")))
    }
}

/// Validates the volume figures of a tap being created or edited.
///
/// All three quantities must be finite and non-negative, and the remaining volume may
/// not exceed the full volume.
pub fn validate_tap_levels(volume: f64, full_volume: f64, flow_rate: f64) -> TapResult<()> {
    for (name, value) in [
        ("volume", volume),
        ("full_volume", full_volume),
        ("flow_rate", flow_rate),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(TapError::invalid(format!("Invalid {name}")));
        }
    }
    if volume > full_volume {
        return Err(TapError::invalid("volume cannot exceed full_volume"));
    }
    Ok(())
}

/// Validates an absolute volume for `set_volume_absolute` and applies the zero clamp.
pub fn absolute_volume(volume: f64) -> TapResult<f64> {
    if volume.is_finite() {
        Ok(clamp_at_zero(volume))
    } else {
        Err(TapError::invalid("Invalid volume"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_pour() {
        let out = apply_pour(5000.0, 20.0, 10.0);
        assert_eq!(out.volume_poured, 200.0);
        assert_eq!(out.new_volume, 4800.0);
    }

    #[test]
    fn test_pour_clamps_at_zero() {
        let out = apply_pour(50.0, 20.0, 10.0);
        assert_eq!(out.volume_poured, 200.0);
        assert_eq!(out.new_volume, 0.0);
    }

    #[test]
    fn test_zero_duration_is_a_no_op() {
        let out = apply_pour(123.5, 20.0, 0.0);
        assert_eq!(out.volume_poured, 0.0);
        assert_eq!(out.new_volume, 123.5);
    }

    #[test]
    fn test_poured_is_unrounded_product() {
        let out = apply_pour(1000.0, 33.3, 1.7);
        assert_eq!(out.volume_poured, 1.7 * 33.3);
        assert_eq!(out.new_volume, 1000.0 - 1.7 * 33.3);
    }

    #[test]
    fn test_volume_never_negative_over_sequence() {
        let mut volume = 500.0;
        for duration in [3.0, 0.5, 12.25, 40.0, 7.0] {
            volume = apply_pour(volume, 18.5, duration).new_volume;
            assert!(volume >= 0.0);
        }
        assert_eq!(volume, 0.0);
    }

    #[test]
    fn test_duration_validation() {
        assert_eq!(validate_duration(2.5, "duration"), Ok(2.5));
        assert_eq!(validate_duration(0.0, "duration"), Ok(0.0));
        assert_eq!(
            validate_duration(-1.0, "duration"),
            Err(TapError::invalid("Invalid duration"))
        );
        assert_eq!(
            validate_duration(f64::NAN, "pour_time"),
            Err(TapError::invalid("Invalid pour_time"))
        );
    }

    #[test]
    fn test_tap_levels_validation() {
        assert!(validate_tap_levels(100.0, 100.0, 20.0).is_ok());
        assert!(validate_tap_levels(0.0, 0.0, 0.0).is_ok());
        assert_eq!(
            validate_tap_levels(120.0, 100.0, 20.0),
            Err(TapError::invalid("volume cannot exceed full_volume"))
        );
        assert_eq!(
            validate_tap_levels(10.0, 100.0, -1.0),
            Err(TapError::invalid("Invalid flow_rate"))
        );
        assert!(validate_tap_levels(f64::INFINITY, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_absolute_volume_clamps_low_only() {
        assert_eq!(absolute_volume(-40.0), Ok(0.0));
        assert_eq!(absolute_volume(99_999.0), Ok(99_999.0));
        assert!(absolute_volume(f64::NAN).is_err());
    }
}
