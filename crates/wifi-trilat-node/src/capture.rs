//! Line-oriented local capture.
//!
//! Reads `aa:bb:cc:dd:ee:ff <rssi>` lines, typically piped from a
//! monitor-mode sniffer, and records each one as a local sighting.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wifi_trilat_core::{MacAddress, SightingOutcome, Tracker};

/// Counters for one capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Non-blank, non-comment lines read.
    pub lines: u64,
    /// Parsed lines whose address is trackable.
    pub recorded: u64,
    /// Lines that did not parse.
    pub malformed: u64,
}

/// Parse one capture line into an address and signal strength.
///
/// Blank lines and `#` comments yield `None` as well as malformed input.
pub fn parse_capture_line(line: &str) -> Option<(MacAddress, i32)> {
    let mut fields = line.split_whitespace();
    let address = fields.next()?.parse::<MacAddress>().ok()?;
    let signal = fields.next()?.parse::<i32>().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((address, signal))
}

fn is_ignorable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// Feed capture lines from `reader` into `tracker` until end of input or
/// shutdown.
pub async fn run_capture<R>(
    reader: R,
    tracker: Arc<Tracker>,
    mut shutdown: watch::Receiver<bool>,
) -> CaptureStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = CaptureStats::default();
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown.changed() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!(lines = stats.lines, recorded = stats.recorded, "capture source closed");
                break;
            }
            Err(e) => {
                warn!("capture read error: {e}");
                break;
            }
        };

        if is_ignorable(&line) {
            continue;
        }
        stats.lines += 1;

        match parse_capture_line(&line) {
            Some((address, signal)) => {
                let outcome = tracker.on_local_sighting(address, signal, Instant::now());
                if outcome != SightingOutcome::Rejected {
                    stats.recorded += 1;
                }
            }
            None => {
                stats.malformed += 1;
                debug!(line = %line, "skipping malformed capture line");
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use wifi_trilat_core::TrackerConfig;

    #[test]
    fn parses_address_and_signal() {
        assert_eq!(
            parse_capture_line("a4:c1:38:0f:22:91 -67"),
            Some((MacAddress([0xa4, 0xc1, 0x38, 0x0f, 0x22, 0x91]), -67))
        );
        assert_eq!(
            parse_capture_line("  A4:C1:38:0F:22:91\t-50  "),
            Some((MacAddress([0xa4, 0xc1, 0x38, 0x0f, 0x22, 0x91]), -50))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_capture_line(""), None);
        assert_eq!(parse_capture_line("a4:c1:38:0f:22:91"), None);
        assert_eq!(parse_capture_line("a4:c1:38:0f:22 -67"), None);
        assert_eq!(parse_capture_line("a4:c1:38:0f:22:91 strong"), None);
        assert_eq!(parse_capture_line("a4:c1:38:0f:22:91 -67 extra"), None);
    }

    #[tokio::test]
    async fn feeds_tracker_and_counts() {
        let tracker = Arc::new(Tracker::new(&TrackerConfig::default()));
        let (_tx, rx) = watch::channel(false);
        let input = b"# sniffer output\n\
            a4:c1:38:0f:22:91 -67\n\
            not a line\n\
            \n\
            01:00:5e:00:00:fb -40\n\
            a4:c1:38:0f:22:92 -71\n";

        let stats = run_capture(BufReader::new(&input[..]), Arc::clone(&tracker), rx).await;

        assert_eq!(
            stats,
            CaptureStats {
                lines: 4,
                recorded: 2,
                malformed: 1,
            }
        );
        assert_eq!(tracker.sighting_count(), 2);
    }
}
