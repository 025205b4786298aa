//! Publishing adapters.
//!
//! Every estimate is published as a flat JSON object:
//!
//! ```json
//! {"topic":"trilat/positions","id":"3f2a…","timestamp":1718000000123,"x":4.37,"y":6.02}
//! ```
//!
//! `timestamp` is Unix milliseconds and the coordinates are rounded to two
//! decimals.

use std::io::{self, Write};
use std::net::{SocketAddr, UdpSocket};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wifi_trilat_core::{PositionEstimate, PositionSink, SinkError};

use crate::config::PublishTarget;

/// Wire representation of one published position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPayload {
    /// Configured publish topic.
    pub topic: String,
    /// Anonymized device identifier.
    pub id: String,
    /// Unix time in milliseconds.
    pub timestamp: i64,
    /// X coordinate, two decimals.
    pub x: f64,
    /// Y coordinate, two decimals.
    pub y: f64,
}

impl PositionPayload {
    /// Build the payload for `estimate` under `topic`.
    pub fn from_estimate(topic: &str, estimate: &PositionEstimate) -> Self {
        Self {
            topic: topic.to_string(),
            id: estimate.id.clone(),
            timestamp: estimate.timestamp.timestamp_millis(),
            x: round2(estimate.position.x),
            y: round2(estimate.position.y),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Writes one JSON line per estimate to any [`Write`] implementation.
pub struct LineSink<W> {
    topic: String,
    writer: Mutex<W>,
}

/// [`LineSink`] over standard output.
pub type StdoutSink = LineSink<io::Stdout>;

impl StdoutSink {
    /// Sink writing to this process's standard output.
    pub fn stdout(topic: impl Into<String>) -> Self {
        Self::new(topic, io::stdout())
    }
}

impl<W: Write> LineSink<W> {
    /// Sink writing JSON lines tagged with `topic` to `writer`.
    pub fn new(topic: impl Into<String>, writer: W) -> Self {
        Self {
            topic: topic.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> PositionSink for LineSink<W> {
    fn emit(&self, estimate: &PositionEstimate) -> Result<(), SinkError> {
        let payload = PositionPayload::from_estimate(&self.topic, estimate);
        let mut line = serde_json::to_vec(&payload)?;
        line.push(b'\n');

        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Sends one JSON datagram per estimate to a fixed address.
pub struct UdpSink {
    topic: String,
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    /// Bind an ephemeral local socket and connect it to `target`.
    pub fn connect(target: SocketAddr, topic: impl Into<String>) -> io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;
        Ok(Self {
            topic: topic.into(),
            socket,
            target,
        })
    }

    /// Destination address.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl PositionSink for UdpSink {
    fn emit(&self, estimate: &PositionEstimate) -> Result<(), SinkError> {
        let payload = PositionPayload::from_estimate(&self.topic, estimate);
        let bytes = serde_json::to_vec(&payload)?;
        let sent = self.socket.send(&bytes)?;
        if sent != bytes.len() {
            return Err(SinkError::Unavailable(format!(
                "short datagram to {}: {sent} of {} bytes",
                self.target,
                bytes.len()
            )));
        }
        Ok(())
    }
}

/// Build the sink for a configured publish target.
pub fn open_sink(target: PublishTarget, topic: &str) -> io::Result<Box<dyn PositionSink>> {
    let sink: Box<dyn PositionSink> = match target {
        PublishTarget::Stdout => Box::new(StdoutSink::stdout(topic)),
        PublishTarget::Udp(addr) => Box::new(UdpSink::connect(addr, topic)?),
    };
    debug!(%target, topic, "publish sink opened");
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wifi_trilat_core::Position;

    fn estimate(x: f64, y: f64) -> PositionEstimate {
        PositionEstimate {
            id: "00112233445566778899aabbccddeeff".to_string(),
            position: Position::new(x, y),
            timestamp: Utc.timestamp_millis_opt(1_718_000_000_123).unwrap(),
            sample_count: 3,
        }
    }

    #[test]
    fn payload_rounds_to_two_decimals() {
        let p = PositionPayload::from_estimate("t", &estimate(4.3749, -0.005001));
        assert_eq!(p.x, 4.37);
        assert_eq!(p.y, -0.01);
        assert_eq!(p.timestamp, 1_718_000_000_123);
    }

    #[test]
    fn payload_json_fields() {
        let p = PositionPayload::from_estimate("site/a", &estimate(1.0, 2.5));
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["topic"], "site/a");
        assert_eq!(v["id"], "00112233445566778899aabbccddeeff");
        assert_eq!(v["timestamp"], 1_718_000_000_123i64);
        assert_eq!(v["x"], 1.0);
        assert_eq!(v["y"], 2.5);
        assert_eq!(v.as_object().unwrap().len(), 5);
    }

    #[test]
    fn line_sink_writes_json_lines() {
        let sink = LineSink::new("trilat/positions", Vec::new());
        sink.emit(&estimate(1.0, 2.0)).unwrap();
        sink.emit(&estimate(3.0, 4.0)).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<PositionPayload> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].x, 3.0);
        assert_eq!(lines[1].topic, "trilat/positions");
    }

    #[test]
    fn udp_sink_sends_one_datagram_per_estimate() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let sink = UdpSink::connect(receiver.local_addr().unwrap(), "t").unwrap();

        sink.emit(&estimate(7.126, 0.0)).unwrap();

        let mut buf = [0u8; 512];
        let n = receiver.recv(&mut buf).unwrap();
        let payload: PositionPayload = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(payload.x, 7.13);
    }
}
