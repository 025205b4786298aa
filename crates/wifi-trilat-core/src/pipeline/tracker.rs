//! Shared tracking state for one node.
//!
//! [`Tracker`] owns both tables and is shared between the capture side
//! (radio frames, peer reports) and the periodic side (sweep, report loop).
//! Each table sits behind its own `parking_lot::Mutex`. A lock covers only a
//! bounded scan plus an insert, overwrite or copy-out; logging and all I/O
//! happen after it is released.
//!
//! The two locks are never held at the same time.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::domain::{
    AggregationTable, IngestOutcome, MacAddress, Position, Sample, SensorReport, SightingOutcome,
    SightingRecord, SightingTable, MAX_SAMPLES,
};

/// A sample window copied out of the aggregation table by [`Tracker::take_ready`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadyWindow {
    /// The tracked device.
    pub address: MacAddress,
    samples: [Sample; MAX_SAMPLES],
    len: usize,
}

impl ReadyWindow {
    fn new(address: MacAddress, window: &[Sample]) -> Self {
        let mut samples = [Sample::default(); MAX_SAMPLES];
        let len = window.len().min(MAX_SAMPLES);
        samples[..len].copy_from_slice(&window[..len]);
        Self {
            address,
            samples,
            len,
        }
    }

    /// Samples of the consumed window.
    pub fn samples(&self) -> &[Sample] {
        &self.samples[..self.len]
    }
}

/// Both tracking tables of one node plus the parameters that gate them.
#[derive(Debug)]
pub struct Tracker {
    sightings: Mutex<SightingTable>,
    aggregation: Mutex<AggregationTable>,
    position: Position,
    timeout: Duration,
    min_samples: usize,
}

impl Tracker {
    /// Create empty tables sized from `config`.
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            sightings: Mutex::new(SightingTable::new(config.capacity)),
            aggregation: Mutex::new(AggregationTable::new(config.capacity)),
            position: config.position,
            timeout: config.staleness_timeout(),
            min_samples: config.min_samples,
        }
    }

    /// This node's own sensor position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// The staleness window.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record a frame received by this node's radio.
    pub fn on_local_sighting(&self, address: MacAddress, signal: i32, now: Instant) -> SightingOutcome {
        let (outcome, total) = {
            let mut table = self.sightings.lock();
            let outcome = table.record(address, signal, now);
            (outcome, table.len())
        };

        match outcome {
            SightingOutcome::Inserted => {
                debug!(%address, signal, total, "new device sighted");
            }
            SightingOutcome::TableFull => {
                trace!(%address, total, "sighting table full, dropping device");
            }
            SightingOutcome::Refreshed | SightingOutcome::Rejected => {}
        }
        outcome
    }

    /// Fold a report from a peer sensor into the aggregation table.
    pub fn on_peer_report(&self, report: &SensorReport, now: Instant) -> IngestOutcome {
        let outcome = self.aggregation.lock().ingest_report(report, now);
        log_ingest(report, outcome);
        outcome
    }

    /// Fresh local sightings, tagged with this node's position.
    ///
    /// Sensor nodes forward these to the coordinator.
    pub fn fresh_reports(&self, now: Instant) -> Vec<SensorReport> {
        let table = self.sightings.lock();
        table
            .fresh(now, self.timeout)
            .map(|r| SensorReport::new(r.address, r.signal, self.position))
            .collect()
    }

    /// Fold every fresh local sighting into the aggregation table at this
    /// node's position. Returns the number of reports accepted.
    ///
    /// The coordinator does this at the start of each sweep.
    pub fn fold_local_sightings(&self, now: Instant) -> usize {
        let reports = self.fresh_reports(now);
        if reports.is_empty() {
            return 0;
        }

        let outcomes: Vec<IngestOutcome> = {
            let mut table = self.aggregation.lock();
            reports
                .iter()
                .map(|r| table.ingest_report(r, now))
                .collect()
        };

        let mut accepted = 0;
        for (report, outcome) in reports.iter().zip(outcomes) {
            log_ingest(report, outcome);
            if outcome.is_accepted() {
                accepted += 1;
            }
        }
        accepted
    }

    /// Copy out and reset every ready window.
    ///
    /// The reset happens under the same lock as ingestion, so a concurrent
    /// report lands either in the consumed window or in the next one.
    pub fn take_ready(&self, now: Instant) -> Vec<ReadyWindow> {
        let mut ready = Vec::new();
        self.aggregation
            .lock()
            .drain_ready(now, self.timeout, self.min_samples, |address, samples| {
                ready.push(ReadyWindow::new(address, samples));
            });
        ready
    }

    /// Copy of the sighting record for `address`.
    pub fn sighting(&self, address: &MacAddress) -> Option<SightingRecord> {
        self.sightings.lock().get(address).copied()
    }

    /// Copy of the current window for `address`.
    pub fn window(&self, address: &MacAddress) -> Option<Vec<Sample>> {
        self.aggregation
            .lock()
            .get(address)
            .map(|r| r.samples().to_vec())
    }

    /// Occupied slots in the sighting table.
    pub fn sighting_count(&self) -> usize {
        self.sightings.lock().len()
    }

    /// Occupied slots in the aggregation table.
    pub fn aggregation_count(&self) -> usize {
        self.aggregation.lock().len()
    }
}

fn log_ingest(report: &SensorReport, outcome: IngestOutcome) {
    match outcome {
        IngestOutcome::Appended { slot } => {
            debug!(
                address = %report.address,
                signal = report.signal,
                sensor = %report.sensor,
                reports = slot + 1,
                "sample added"
            );
        }
        IngestOutcome::RecordFull => {
            debug!(address = %report.address, sensor = %report.sensor, "window full, dropping report");
        }
        IngestOutcome::TableFull => {
            debug!(address = %report.address, "aggregation table full, dropping report");
        }
        IngestOutcome::Refreshed { .. } | IngestOutcome::Rejected => {}
    }
}
