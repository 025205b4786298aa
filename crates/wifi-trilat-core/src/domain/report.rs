//! Sensor positions and the reports sensor nodes contribute.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::address::MacAddress;

/// A point on the site plan.
///
/// Used both for the fixed, configured position of a sensor node and for an
/// estimated device position. Sensor positions are configuration constants,
/// so two samples from the same node compare equal with exact float equality.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate in site units.
    pub x: f64,
    /// Y coordinate in site units.
    pub y: f64,
}

impl Position {
    /// Create a new position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// One sensor node's contribution about one sighting.
///
/// Produced locally with the node's own position, or decoded from a peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReport {
    /// The device that was sighted.
    pub address: MacAddress,
    /// Received signal strength in dBm.
    pub signal: i32,
    /// Where the reporting sensor is installed.
    pub sensor: Position,
}

impl SensorReport {
    /// Create a new report.
    pub fn new(address: MacAddress, signal: i32, sensor: Position) -> Self {
        Self {
            address,
            signal,
            sensor,
        }
    }
}
