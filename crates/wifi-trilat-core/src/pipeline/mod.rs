//! Runtime pipeline: shared tracking state and the periodic sweep.

mod sweep;
mod tracker;

pub use sweep::{SweepDriver, SweepSummary};
pub use tracker::{ReadyWindow, Tracker};
