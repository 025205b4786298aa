//! In-memory result sink.

use parking_lot::Mutex;

use crate::error::SinkError;
use crate::port::{PositionEstimate, PositionSink};

/// Keeps every emitted estimate, oldest first.
///
/// Useful for embedding the engine in another process that polls for
/// results, and as a test double.
#[derive(Debug, Default)]
pub struct MemorySink {
    estimates: Mutex<Vec<PositionEstimate>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all estimates collected so far.
    pub fn drain(&self) -> Vec<PositionEstimate> {
        std::mem::take(&mut *self.estimates.lock())
    }

    /// Copy of the collected estimates.
    pub fn snapshot(&self) -> Vec<PositionEstimate> {
        self.estimates.lock().clone()
    }

    /// Number of collected estimates.
    pub fn len(&self) -> usize {
        self.estimates.lock().len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.estimates.lock().is_empty()
    }
}

impl PositionSink for MemorySink {
    fn emit(&self, estimate: &PositionEstimate) -> Result<(), SinkError> {
        self.estimates.lock().push(estimate.clone());
        Ok(())
    }
}
