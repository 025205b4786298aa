//! Empirical RSSI to distance conversion.
//!
//! A two-branch curve fit of the log-distance path loss model. With
//! `ratio = rssi / reference_power`:
//!
//! ```text
//! ratio <  1.0   d = ratio ^ near_field_exponent
//! ratio >= 1.0   d = far_field_coefficient * ratio ^ path_loss_exponent + far_field_offset
//! ```
//!
//! The branch boundary and default constants must stay as they are: published
//! coordinates depend on them bit for bit.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Result of converting one signal sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    /// Estimated distance in site units.
    Estimated(f64),
    /// The sample carried no usable signal (a zero reading).
    Unknown,
}

impl Distance {
    /// Radius value fed into the trilateration equations.
    ///
    /// `Unknown` maps to `-1.0`, which keeps the linear solve identical to
    /// deployments that predate the tagged representation.
    pub fn radius(&self) -> f64 {
        match self {
            Self::Estimated(d) => *d,
            Self::Unknown => Self::UNKNOWN_RADIUS,
        }
    }

    /// The estimate, or `None` for an unknown distance.
    pub fn meters(&self) -> Option<f64> {
        match self {
            Self::Estimated(d) => Some(*d),
            Self::Unknown => None,
        }
    }

    /// Whether a physical distance was estimated.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Estimated(_))
    }

    const UNKNOWN_RADIUS: f64 = -1.0;
}

/// Calibration constants for [`DistanceModel::estimate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceModel {
    /// Expected RSSI at one unit of distance (dBm). Default: **-59**.
    pub reference_power: f64,
    /// Exponent of the far-field branch. Default: **7.7095**.
    pub path_loss_exponent: f64,
    /// Multiplier of the far-field branch. Default: **0.89976**.
    pub far_field_coefficient: f64,
    /// Additive term of the far-field branch. Default: **0.111**.
    pub far_field_offset: f64,
    /// Exponent of the near-field branch. Default: **10**.
    pub near_field_exponent: f64,
}

impl DistanceModel {
    /// Convert a signal strength in dBm to a distance estimate.
    pub fn estimate(&self, signal: i32) -> Distance {
        if signal == 0 {
            return Distance::Unknown;
        }

        let ratio = f64::from(signal) / self.reference_power;
        if ratio < 1.0 {
            Distance::Estimated(ratio.powf(self.near_field_exponent))
        } else {
            Distance::Estimated(
                self.far_field_coefficient * ratio.powf(self.path_loss_exponent)
                    + self.far_field_offset,
            )
        }
    }

    /// Check that the constants describe a usable curve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.reference_power.is_finite() || self.reference_power >= 0.0 {
            return Err(ConfigError::invalid_value(
                "distance.reference_power",
                format!("must be a negative dBm value, got {}", self.reference_power),
            ));
        }
        for (field, value) in [
            ("distance.path_loss_exponent", self.path_loss_exponent),
            ("distance.far_field_coefficient", self.far_field_coefficient),
            ("distance.far_field_offset", self.far_field_offset),
            ("distance.near_field_exponent", self.near_field_exponent),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid_value(field, "must be finite"));
            }
        }
        Ok(())
    }
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self {
            reference_power: -59.0,
            path_loss_exponent: 7.7095,
            far_field_coefficient: 0.89976,
            far_field_offset: 0.111,
            near_field_exponent: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_signal_is_unknown() {
        let model = DistanceModel::default();
        let d = model.estimate(0);
        assert_eq!(d, Distance::Unknown);
        assert_eq!(d.radius(), -1.0);
        assert_eq!(d.meters(), None);
    }

    #[test]
    fn reference_power_sits_on_far_branch() {
        // ratio == 1.0 takes the far-field branch.
        let d = DistanceModel::default().estimate(-59).radius();
        assert!((d - (0.89976 + 0.111)).abs() < 1e-12, "got {d}");
    }

    #[test]
    fn stronger_than_reference_uses_near_branch() {
        let d = DistanceModel::default().estimate(-30).radius();
        let expected = (30.0_f64 / 59.0).powf(10.0);
        assert!((d - expected).abs() < 1e-12);
        assert!(d < 1.0);
    }

    #[test]
    fn weaker_than_reference_uses_far_branch() {
        let d = DistanceModel::default().estimate(-80).radius();
        let expected = 0.89976 * (80.0_f64 / 59.0).powf(7.7095) + 0.111;
        assert!((d - expected).abs() < 1e-12);
    }

    #[test]
    fn distance_grows_as_signal_weakens() {
        let model = DistanceModel::default();
        let mut last = 0.0;
        for rssi in (-95..=-20).rev() {
            let d = model.estimate(rssi).radius();
            assert!(d > last, "rssi {rssi}: {d} <= {last}");
            last = d;
        }
    }

    #[test]
    fn validate_rejects_non_negative_reference() {
        let mut model = DistanceModel::default();
        assert!(model.validate().is_ok());
        model.reference_power = 0.0;
        assert!(model.validate().is_err());
        model.reference_power = -59.0;
        model.path_loss_exponent = f64::NAN;
        assert!(model.validate().is_err());
    }
}
