//! Periodic sweep: turn ready sample windows into published positions.
//!
//! One call to [`SweepDriver::run_once`]:
//!
//! 1. (coordinator only) folds fresh local sightings into the aggregation
//!    table at the node's own position,
//! 2. copies out and resets every ready window,
//! 3. for each window, outside any lock: solve, anonymize, emit.
//!
//! A window the solver cannot handle is skipped. A sink failure is logged
//! and the estimate is dropped; the window has already been consumed.

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::port::{Anonymizer, PositionEstimate, PositionSink};
use crate::model::PositionSolver;

use super::tracker::Tracker;

/// Counters describing one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Local sightings folded into the aggregation table.
    pub folded: usize,
    /// Windows that were ready and consumed.
    pub ready: usize,
    /// Estimates accepted by the sink.
    pub emitted: usize,
    /// Windows the solver returned nothing for.
    pub skipped: usize,
    /// Estimates the sink failed to deliver.
    pub sink_failures: usize,
}

/// Drives the solver over a [`Tracker`] and feeds the results to a sink.
pub struct SweepDriver<A, S> {
    solver: PositionSolver,
    anonymizer: A,
    sink: S,
    fold_local: bool,
}

impl<A, S> SweepDriver<A, S>
where
    A: Anonymizer,
    S: PositionSink,
{
    /// Create a driver that only drains reports already in the aggregation
    /// table.
    pub fn new(solver: PositionSolver, anonymizer: A, sink: S) -> Self {
        Self {
            solver,
            anonymizer,
            sink,
            fold_local: false,
        }
    }

    /// Also fold this node's own fresh sightings before each drain.
    #[must_use]
    pub fn with_local_fold(mut self, enabled: bool) -> Self {
        self.fold_local = enabled;
        self
    }

    /// The sink results are handed to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one sweep, stamping estimates with the current wall-clock time.
    pub fn run_once(&self, tracker: &Tracker, now: Instant) -> SweepSummary {
        self.run_at(tracker, now, Utc::now())
    }

    /// Run one sweep with an explicit wall-clock timestamp.
    pub fn run_at(&self, tracker: &Tracker, now: Instant, timestamp: DateTime<Utc>) -> SweepSummary {
        let mut summary = SweepSummary::default();

        if self.fold_local {
            summary.folded = tracker.fold_local_sightings(now);
        }

        let windows = tracker.take_ready(now);
        summary.ready = windows.len();

        for window in &windows {
            let Some(position) = self.solver.solve(window.samples()) else {
                summary.skipped += 1;
                continue;
            };

            let estimate = PositionEstimate {
                id: self.anonymizer.anonymize(&window.address),
                position,
                timestamp,
                sample_count: window.samples().len(),
            };

            match self.sink.emit(&estimate) {
                Ok(()) => {
                    summary.emitted += 1;
                    info!(
                        id = %estimate.id,
                        x = position.x,
                        y = position.y,
                        samples = estimate.sample_count,
                        "position estimated"
                    );
                }
                Err(e) => {
                    summary.sink_failures += 1;
                    warn!(id = %estimate.id, "failed to emit position: {e}");
                }
            }
        }

        debug!(
            folded = summary.folded,
            ready = summary.ready,
            emitted = summary.emitted,
            skipped = summary.skipped,
            sink_failures = summary.sink_failures,
            "sweep complete"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemorySink, Sha256Anonymizer};
    use crate::config::TrackerConfig;
    use crate::domain::{MacAddress, Position, SensorReport};
    use crate::error::SinkError;

    struct FailingSink;

    impl PositionSink for FailingSink {
        fn emit(&self, _estimate: &PositionEstimate) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("broker down".into()))
        }
    }

    fn report(last: u8, signal: i32, x: f64, y: f64) -> SensorReport {
        SensorReport::new(
            MacAddress([0x00, 0x0c, 0x29, 0x00, 0x00, last]),
            signal,
            Position::new(x, y),
        )
    }

    #[test]
    fn emits_midpoint_and_resets_window() {
        let tracker = Tracker::new(&TrackerConfig::default());
        let driver = SweepDriver::new(PositionSolver::default(), Sha256Anonymizer, MemorySink::new());
        let now = Instant::now();

        tracker.on_peer_report(&report(1, -60, 0.0, 0.0), now);
        tracker.on_peer_report(&report(1, -65, 10.0, 0.0), now);

        let summary = driver.run_once(&tracker, now);
        assert_eq!(summary.ready, 1);
        assert_eq!(summary.emitted, 1);

        let out = driver.sink().drain();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position, Position::new(5.0, 0.0));
        assert_eq!(out[0].id, Sha256Anonymizer.anonymize(&report(1, 0, 0.0, 0.0).address));
        assert_eq!(out[0].sample_count, 2);

        // Consumed: a second sweep has nothing to do.
        assert_eq!(driver.run_once(&tracker, now).ready, 0);
    }

    #[test]
    fn sink_failure_is_counted_and_window_still_consumed() {
        let tracker = Tracker::new(&TrackerConfig::default());
        let driver = SweepDriver::new(PositionSolver::default(), Sha256Anonymizer, FailingSink);
        let now = Instant::now();
        tracker.on_peer_report(&report(2, -60, 0.0, 0.0), now);
        tracker.on_peer_report(&report(2, -61, 0.0, 4.0), now);

        let summary = driver.run_once(&tracker, now);
        assert_eq!(summary.sink_failures, 1);
        assert_eq!(summary.emitted, 0);
        assert_eq!(tracker.window(&report(2, 0, 0.0, 0.0).address), Some(vec![]));
    }

    #[test]
    fn local_fold_only_when_enabled() {
        let mut config = TrackerConfig::default();
        config.position = Position::new(10.0, 10.0);
        let tracker = Tracker::new(&config);
        let now = Instant::now();
        let r = report(3, -60, 0.0, 10.0);
        tracker.on_local_sighting(r.address, -70, now);
        tracker.on_peer_report(&r, now);

        let passive = SweepDriver::new(PositionSolver::default(), Sha256Anonymizer, MemorySink::new());
        assert_eq!(passive.run_once(&tracker, now), SweepSummary::default());

        let folding = SweepDriver::new(PositionSolver::default(), Sha256Anonymizer, MemorySink::new())
            .with_local_fold(true);
        let summary = folding.run_once(&tracker, now);
        assert_eq!(summary.folded, 1);
        assert_eq!(summary.emitted, 1);
        assert_eq!(folding.sink().snapshot()[0].position, Position::new(5.0, 10.0));
    }
}
