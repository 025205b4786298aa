//! Engine configuration.
//!
//! [`TrackerConfig`] holds everything the tables, the solver and the sweep
//! need. It is read once at startup and never changes afterwards. It is
//! serializable via [`serde`] so nodes can load it from a JSON file.
//!
//! # Example
//!
//! ```rust
//! use wifi_trilat_core::config::TrackerConfig;
//!
//! let cfg = TrackerConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! assert_eq!(cfg.capacity, 50);
//! assert_eq!(cfg.staleness_timeout_ms, 10_000);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Position, MAX_CAPACITY, MAX_SAMPLES};
use crate::error::ConfigError;
use crate::model::DistanceModel;

/// Complete configuration of one tracking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum number of devices in each table, at most
    /// [`MAX_CAPACITY`](crate::domain::MAX_CAPACITY). Default: **50**.
    pub capacity: usize,

    /// Age after which sightings and windows are ignored. Default: **10000 ms**.
    pub staleness_timeout_ms: u64,

    /// Period of the sweep on the coordinator. Default: **5000 ms**.
    pub sweep_interval_ms: u64,

    /// Period at which a sensor node forwards its fresh sightings.
    /// Default: **2000 ms**.
    pub report_interval_ms: u64,

    /// Distinct sensor positions needed before a window is solved.
    /// Must be 2 or 3. Default: **2**.
    pub min_samples: usize,

    /// Where this node is installed. Default: **(5.0, 5.0)**.
    pub position: Position,

    /// RSSI to distance calibration.
    pub distance: DistanceModel,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            staleness_timeout_ms: 10_000,
            sweep_interval_ms: 5_000,
            report_interval_ms: 2_000,
            min_samples: 2,
            position: Position::new(5.0, 5.0),
            distance: DistanceModel::default(),
        }
    }
}

impl TrackerConfig {
    /// Load a [`TrackerConfig`] from a JSON file at `path` and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened,
    /// [`ConfigError::Json`] if it is malformed, and
    /// [`ConfigError::InvalidValue`] if validation fails.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: TrackerConfig = serde_json::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this configuration as pretty-printed JSON.
    ///
    /// Returns [`ConfigError::FileWrite`] if the file cannot be written.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate all fields, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::invalid_value(
                "capacity",
                format!("must be between 1 and {MAX_CAPACITY}, got {}", self.capacity),
            ));
        }
        if self.staleness_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "staleness_timeout_ms",
                "must be > 0",
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::invalid_value("sweep_interval_ms", "must be > 0"));
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::invalid_value("report_interval_ms", "must be > 0"));
        }
        if !(2..=MAX_SAMPLES).contains(&self.min_samples) {
            return Err(ConfigError::invalid_value(
                "min_samples",
                format!("must be between 2 and {MAX_SAMPLES}, got {}", self.min_samples),
            ));
        }
        if !self.position.is_finite() {
            return Err(ConfigError::invalid_value("position", "must be finite"));
        }
        self.distance.validate()
    }

    /// Staleness window as a [`Duration`].
    pub fn staleness_timeout(&self) -> Duration {
        Duration::from_millis(self.staleness_timeout_ms)
    }

    /// Sweep period as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Report period as a [`Duration`].
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        TrackerConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let cfg = TrackerConfig {
            capacity: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "capacity", .. })
        ));
    }

    #[test]
    fn oversized_capacity_is_invalid() {
        let cfg: TrackerConfig =
            serde_json::from_str(r#"{ "capacity": 18446744073709551615 }"#).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "capacity", .. })
        ));

        let at_limit = TrackerConfig {
            capacity: MAX_CAPACITY,
            ..TrackerConfig::default()
        };
        assert!(at_limit.validate().is_ok());
        assert!(TrackerConfig { capacity: MAX_CAPACITY + 1, ..at_limit }.validate().is_err());
    }

    #[test]
    fn min_samples_out_of_range_is_invalid() {
        for bad in [0, 1, 4] {
            let cfg = TrackerConfig {
                min_samples: bad,
                ..TrackerConfig::default()
            };
            assert!(cfg.validate().is_err(), "min_samples={bad}");
        }
    }

    #[test]
    fn non_finite_position_is_invalid() {
        let cfg = TrackerConfig {
            position: Position::new(f64::INFINITY, 0.0),
            ..TrackerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: TrackerConfig =
            serde_json::from_str(r#"{ "capacity": 8, "position": { "x": 1.5, "y": -2.0 } }"#)
                .unwrap();
        assert_eq!(cfg.capacity, 8);
        assert_eq!(cfg.position, Position::new(1.5, -2.0));
        assert_eq!(cfg.sweep_interval_ms, 5_000);
        assert_eq!(cfg.distance, DistanceModel::default());
    }

    #[test]
    fn durations_match_millis() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.staleness_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(5));
        assert_eq!(cfg.report_interval(), Duration::from_secs(2));
    }
}
