//! # wifi-trilat-node
//!
//! Runtime for one node of a wifi-trilat sensor network.
//!
//! A **coordinator** hears devices itself, receives [`wire`] frames from
//! peer sensors, sweeps its tracker every few seconds and publishes each
//! position as JSON. A **sensor** only hears devices and forwards its fresh
//! sightings to the coordinator.
//!
//! - [`config`]: [`NodeConfig`], role and publish target
//! - [`wire`]: 24-byte peer report frames
//! - [`peer`]: UDP listener, peer registry and report sender
//! - [`capture`]: line-oriented local capture
//! - [`publish`]: stdout and UDP position sinks
//! - [`runtime`]: the tokio tasks, started with [`start`]

#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod error;
pub mod peer;
pub mod publish;
pub mod runtime;
pub mod wire;

pub use config::{NodeConfig, PublishTarget, Role};
pub use error::{NodeError, WireError};
pub use runtime::{start, NodeHandle};
