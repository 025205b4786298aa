//! The driven port that receives position estimates.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Position;
use crate::error::SinkError;

/// A published position fix for one anonymized device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionEstimate {
    /// Anonymized device identifier.
    pub id: String,
    /// Estimated position.
    pub position: Position,
    /// When the sweep produced the estimate.
    pub timestamp: DateTime<Utc>,
    /// Number of sensor positions that contributed.
    pub sample_count: usize,
}

/// Destination for position estimates.
///
/// Called by the sweep outside of any table lock. A failed emit is logged
/// and the estimate is discarded; retrying belongs to the transport.
///
/// Implementations include:
/// - [`crate::adapter::MemorySink`] -- keeps estimates in memory.
pub trait PositionSink: Send + Sync {
    /// Deliver one estimate.
    fn emit(&self, estimate: &PositionEstimate) -> Result<(), SinkError>;
}

impl<T: PositionSink + ?Sized> PositionSink for std::sync::Arc<T> {
    fn emit(&self, estimate: &PositionEstimate) -> Result<(), SinkError> {
        (**self).emit(estimate)
    }
}

impl<T: PositionSink + ?Sized> PositionSink for Box<T> {
    fn emit(&self, estimate: &PositionEstimate) -> Result<(), SinkError> {
        (**self).emit(estimate)
    }
}
