//! Signal-to-distance model and the position solver built on it.

pub mod distance;
pub mod solver;

pub use distance::{Distance, DistanceModel};
pub use solver::{trilaterate, PositionSolver};
