//! Error types for the wifi-trilat-core crate.
//!
//! The tracking tables and the solver never fail: capacity exhaustion,
//! rejected addresses and degenerate geometry are policy outcomes, not
//! errors. Errors only exist at the edges of the engine:
//!
//! ```text
//! ConfigError   (config validation / file loading)
//! AddressError  (hardware address parsing)
//! SinkError     (result emission)
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading or validating a [`crate::config::TrackerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has a value that the engine cannot work with.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("Cannot read config file {path:?}: {source}")]
    FileRead {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Cannot write config file {path:?}: {source}")]
    FileWrite {
        /// Path that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("Malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors produced when parsing a hardware address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The byte slice was not exactly 6 bytes long.
    #[error("invalid MAC address: expected 6 bytes, got {len}")]
    InvalidLength {
        /// The number of bytes that were provided.
        len: usize,
    },

    /// The text was not of the form `aa:bb:cc:dd:ee:ff`.
    #[error("failed to parse MAC address from '{input}': expected aa:bb:cc:dd:ee:ff")]
    ParseFailed {
        /// The input string that could not be parsed.
        input: String,
    },
}

/// Errors returned by a [`crate::port::PositionSink`].
///
/// The engine logs these and moves on; retrying is the transport's job.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The transport failed to deliver the estimate.
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The estimate could not be serialized for the transport.
    #[error("Sink serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The transport is not currently able to accept results.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}
