//! Aggregation table: per-device sample windows awaiting a position fix.
//!
//! Each record collects up to [`MAX_SAMPLES`] signal samples, one per
//! distinct sensor position. A report from a position already present in the
//! window refreshes that slot instead of appending. Once the sweep consumes a
//! window, only the sample count is cleared; the slot array keeps its old
//! contents and is overwritten from index 0 as new reports arrive.
//!
//! Like the sighting table this is a bounded arena with linear lookup and
//! first-seen iteration order. Records are never removed.

use std::time::{Duration, Instant};

use super::address::MacAddress;
use super::report::{Position, SensorReport};
use super::MAX_CAPACITY;

/// Maximum number of distinct sensor positions per window.
pub const MAX_SAMPLES: usize = 3;

/// One sensor's view of a device inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Signal strength in dBm.
    pub signal: i32,
    /// Position of the sensor that heard it.
    pub sensor: Position,
}

impl Sample {
    /// Create a new sample.
    pub const fn new(signal: i32, x: f64, y: f64) -> Self {
        Self {
            signal,
            sensor: Position::new(x, y),
        }
    }
}

/// Accumulator for one device.
#[derive(Debug, Clone)]
pub struct AggregationRecord {
    address: MacAddress,
    samples: [Sample; MAX_SAMPLES],
    sample_count: usize,
    updated_at: Instant,
}

impl AggregationRecord {
    fn new(address: MacAddress, now: Instant) -> Self {
        Self {
            address,
            samples: [Sample::default(); MAX_SAMPLES],
            sample_count: 0,
            updated_at: now,
        }
    }

    /// The tracked device.
    pub fn address(&self) -> MacAddress {
        self.address
    }

    /// Samples in the current window, in arrival order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples[..self.sample_count]
    }

    /// Number of distinct positions in the current window.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// When a sample was last appended or refreshed.
    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    /// Whether the window has room for another distinct position.
    pub fn is_full(&self) -> bool {
        self.sample_count >= MAX_SAMPLES
    }

    /// Ready for the solver at `now`.
    pub fn is_ready(&self, now: Instant, timeout: Duration, min_samples: usize) -> bool {
        self.sample_count >= min_samples
            && now.saturating_duration_since(self.updated_at) < timeout
    }

    fn slot_for(&self, sensor: &Position) -> Option<usize> {
        self.samples()
            .iter()
            .position(|s| s.sensor.x == sensor.x && s.sensor.y == sensor.y)
    }

    fn add(&mut self, signal: i32, sensor: Position, now: Instant) -> IngestOutcome {
        if let Some(slot) = self.slot_for(&sensor) {
            self.samples[slot].signal = signal;
            self.updated_at = now;
            return IngestOutcome::Refreshed { slot };
        }

        if self.is_full() {
            return IngestOutcome::RecordFull;
        }

        let slot = self.sample_count;
        self.samples[slot] = Sample { signal, sensor };
        self.sample_count += 1;
        self.updated_at = now;
        IngestOutcome::Appended { slot }
    }

    fn reset(&mut self) {
        self.sample_count = 0;
    }
}

/// What [`AggregationTable::ingest`] did with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new sensor position was added to the window at `slot`.
    Appended {
        /// Index of the new sample.
        slot: usize,
    },
    /// The sample from the same sensor position at `slot` was overwritten.
    Refreshed {
        /// Index of the refreshed sample.
        slot: usize,
    },
    /// The address has the group bit set and was ignored.
    Rejected,
    /// The window already holds three other positions.
    RecordFull,
    /// The address is new and the table is full.
    TableFull,
}

impl IngestOutcome {
    /// Whether the report changed the table.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Appended { .. } | Self::Refreshed { .. })
    }
}

/// Bounded set of per-device accumulators.
#[derive(Debug, Clone)]
pub struct AggregationTable {
    records: Vec<AggregationRecord>,
    capacity: usize,
}

impl AggregationTable {
    /// Default number of tracked devices.
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Create an empty table holding at most `capacity` devices, clamped to
    /// [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_CAPACITY);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Fold one report into the table.
    pub fn ingest(
        &mut self,
        address: MacAddress,
        signal: i32,
        sensor: Position,
        now: Instant,
    ) -> IngestOutcome {
        if address.is_multicast() {
            return IngestOutcome::Rejected;
        }

        let idx = match self.records.iter().position(|r| r.address == address) {
            Some(idx) => idx,
            None if self.records.len() < self.capacity => {
                self.records.push(AggregationRecord::new(address, now));
                self.records.len() - 1
            }
            None => return IngestOutcome::TableFull,
        };

        self.records[idx].add(signal, sensor, now)
    }

    /// Convenience wrapper around [`ingest`](Self::ingest).
    pub fn ingest_report(&mut self, report: &SensorReport, now: Instant) -> IngestOutcome {
        self.ingest(report.address, report.signal, report.sensor, now)
    }

    /// Hand every ready window to `visit`, then clear its sample count.
    ///
    /// A record is ready when it holds at least `min_samples` positions and
    /// was updated less than `timeout` before `now`. Returns the number of
    /// records visited.
    pub fn drain_ready<F>(
        &mut self,
        now: Instant,
        timeout: Duration,
        min_samples: usize,
        mut visit: F,
    ) -> usize
    where
        F: FnMut(MacAddress, &[Sample]),
    {
        let mut drained = 0;
        for record in self
            .records
            .iter_mut()
            .filter(|r| r.is_ready(now, timeout, min_samples))
        {
            visit(record.address, record.samples());
            record.reset();
            drained += 1;
        }
        drained
    }

    /// Look up the record for an address.
    pub fn get(&self, address: &MacAddress) -> Option<&AggregationRecord> {
        self.records.iter().find(|r| &r.address == address)
    }

    /// All records in first-seen order.
    pub fn records(&self) -> impl Iterator<Item = &AggregationRecord> + '_ {
        self.records.iter()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no device has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of devices.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AggregationTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
