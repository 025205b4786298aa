//! Domain types for device tracking: identity, reports and the two bounded
//! tables.

pub mod address;
pub mod aggregation;
pub mod report;
pub mod sighting;

/// Upper bound on either table's capacity.
///
/// Every ingest and sweep scans its table linearly, so capacity is kept to
/// a few hundred devices.
pub const MAX_CAPACITY: usize = 1024;

pub use address::MacAddress;
pub use aggregation::{AggregationRecord, AggregationTable, IngestOutcome, Sample, MAX_SAMPLES};
pub use report::{Position, SensorReport};
pub use sighting::{SightingOutcome, SightingRecord, SightingTable};
