//! # wifi-trilat-core
//!
//! Device tracking and RSSI trilateration engine for a small network of
//! fixed-position WiFi sensor nodes.
//!
//! One node, the coordinator, hears devices itself and receives reports from
//! peer sensors. Reports about the same device are grouped by sensor
//! position (up to three) and turned into a 2-D estimate.
//!
//! This crate provides:
//!
//! - **Domain types**: [`MacAddress`], [`Position`], [`SensorReport`]
//! - **Tables**: [`SightingTable`] (what this node hears) and
//!   [`AggregationTable`] (per-device sample windows)
//! - **Model**: [`DistanceModel`] and [`PositionSolver`]
//! - **Ports**: [`Anonymizer`] and [`PositionSink`]
//! - **Adapters**: [`Sha256Anonymizer`], [`MemorySink`]
//! - **Pipeline**: [`Tracker`] (shared state) and [`SweepDriver`]
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use wifi_trilat_core::{
//!     MacAddress, MemorySink, Position, PositionSolver, SensorReport, Sha256Anonymizer,
//!     SweepDriver, Tracker, TrackerConfig,
//! };
//!
//! let tracker = Tracker::new(&TrackerConfig::default());
//! let driver = SweepDriver::new(PositionSolver::default(), Sha256Anonymizer, MemorySink::new());
//!
//! let device = MacAddress([0x24, 0x0a, 0xc4, 0x01, 0x02, 0x03]);
//! let now = Instant::now();
//! tracker.on_peer_report(&SensorReport::new(device, -60, Position::new(0.0, 0.0)), now);
//! tracker.on_peer_report(&SensorReport::new(device, -64, Position::new(10.0, 0.0)), now);
//!
//! let summary = driver.run_once(&tracker, now);
//! assert_eq!(summary.emitted, 1);
//! assert_eq!(driver.sink().snapshot()[0].position, Position::new(5.0, 0.0));
//! ```

#![warn(missing_docs)]

pub mod adapter;
pub mod config;
pub mod domain;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod port;

// Re-export key types at the crate root for convenience.
pub use adapter::{MemorySink, Sha256Anonymizer};
pub use config::TrackerConfig;
pub use domain::{
    AggregationRecord, AggregationTable, IngestOutcome, MacAddress, Position, Sample,
    SensorReport, SightingOutcome, SightingRecord, SightingTable, MAX_CAPACITY, MAX_SAMPLES,
};
pub use error::{AddressError, ConfigError, SinkError};
pub use model::{Distance, DistanceModel, PositionSolver};
pub use pipeline::{ReadyWindow, SweepDriver, SweepSummary, Tracker};
pub use port::{Anonymizer, PositionEstimate, PositionSink};
