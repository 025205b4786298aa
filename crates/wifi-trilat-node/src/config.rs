//! Node configuration.
//!
//! [`NodeConfig`] wraps the engine's [`TrackerConfig`] with everything the
//! runtime needs: which role this node plays, where peer reports arrive,
//! where the coordinator lives and where positions are published.
//!
//! ```json
//! {
//!   "role": "sensor",
//!   "coordinator": "192.168.4.1:4210",
//!   "tracker": { "position": { "x": 10.0, "y": 0.0 } }
//! }
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wifi_trilat_core::{ConfigError, TrackerConfig};

use crate::peer::DEFAULT_MAX_PEERS;

/// Default UDP port for peer reports.
pub const DEFAULT_PEER_PORT: u16 = 4210;

/// Which part of the network a node plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Receives peer reports, sweeps and publishes positions.
    #[default]
    Coordinator,
    /// Forwards fresh sightings to the coordinator.
    Sensor,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coordinator" => Ok(Self::Coordinator),
            "sensor" => Ok(Self::Sensor),
            other => Err(format!("unknown role '{other}', expected coordinator or sensor")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinator => f.write_str("coordinator"),
            Self::Sensor => f.write_str("sensor"),
        }
    }
}

/// Where published positions go.
///
/// Written as `stdout` or `udp:<host>:<port>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PublishTarget {
    /// JSON lines on standard output.
    #[default]
    Stdout,
    /// One JSON datagram per position.
    Udp(SocketAddr),
}

impl FromStr for PublishTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("stdout") {
            return Ok(Self::Stdout);
        }
        let addr = s.strip_prefix("udp:").unwrap_or(s);
        addr.parse()
            .map(Self::Udp)
            .map_err(|_| format!("invalid publish target '{s}', expected stdout or udp:<host>:<port>"))
    }
}

impl TryFrom<String> for PublishTarget {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PublishTarget> for String {
    fn from(target: PublishTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Udp(addr) => write!(f, "udp:{addr}"),
        }
    }
}

/// Complete configuration of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Coordinator or sensor.
    pub role: Role,

    /// Address the coordinator listens on for peer reports.
    pub listen: SocketAddr,

    /// Where a sensor sends its reports. Required for the sensor role.
    pub coordinator: Option<SocketAddr>,

    /// Most peer sensors the coordinator keeps bookkeeping for.
    pub max_peers: usize,

    /// Destination for published positions.
    pub publish: PublishTarget,

    /// Topic attached to every published payload.
    pub topic: String,

    /// Engine settings.
    pub tracker: TrackerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: Role::Coordinator,
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PEER_PORT)),
            coordinator: None,
            max_peers: DEFAULT_MAX_PEERS,
            publish: PublishTarget::Stdout,
            topic: "trilat/positions".to_string(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a JSON file and validate.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: NodeConfig = serde_json::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write as pretty-printed JSON.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the engine settings and the role-specific fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracker.validate()?;
        if self.role == Role::Sensor && self.coordinator.is_none() {
            return Err(ConfigError::invalid_value(
                "coordinator",
                "required when role is sensor",
            ));
        }
        if self.max_peers == 0 {
            return Err(ConfigError::invalid_value("max_peers", "must be > 0"));
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::invalid_value("topic", "must not be empty"));
        }
        Ok(())
    }
}
