//! Adapter implementations for the engine's ports.
//!
//! - [`Sha256Anonymizer`]: [`Anonymizer`](crate::port::Anonymizer) backed by truncated SHA-256.
//! - [`MemorySink`]: [`PositionSink`](crate::port::PositionSink) that keeps estimates in memory.
//!
//! Network sinks live in the `wifi-trilat-node` crate.

mod memory;
mod sha256;

pub use memory::MemorySink;
pub use sha256::Sha256Anonymizer;
