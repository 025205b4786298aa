//! Error types for the node runtime.

use std::net::SocketAddr;

use thiserror::Error;
use wifi_trilat_core::ConfigError;

/// Errors that can occur when decoding a peer report datagram.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    /// Not enough bytes left for a complete frame.
    #[error("Insufficient data: need {needed} bytes, got {got}")]
    InsufficientData {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        got: usize,
    },

    /// The frame does not start with the report magic.
    #[error("Invalid magic: expected {expected:#010x}, got {got:#010x}")]
    InvalidMagic {
        /// The report magic.
        expected: u32,
        /// What the frame carried.
        got: u32,
    },

    /// The sensor coordinates are NaN or infinite.
    #[error("Non-finite sensor position ({x}, {y})")]
    NonFinitePosition {
        /// Decoded X.
        x: f32,
        /// Decoded Y.
        y: f32,
    },
}

/// Top-level error for a running node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Socket could not be bound.
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
