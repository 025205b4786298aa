//! Port definitions for the collaborators the engine hands results to.
//!
//! Hexagonal-architecture ports: the sweep only knows these traits, so the
//! publish transport and the anonymization primitive can be swapped without
//! touching the tables or the solver.

mod anonymizer;
mod sink;

pub use anonymizer::Anonymizer;
pub use sink::{PositionEstimate, PositionSink};
