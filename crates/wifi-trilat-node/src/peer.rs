//! Peer transport between sensor nodes and the coordinator.
//!
//! Sensors push their fresh sightings with a [`ReportSender`]. The
//! coordinator runs a [`PeerListener`] that decodes each datagram, folds the
//! reports into the aggregation table and keeps per-peer bookkeeping in a
//! [`PeerRegistry`]. Bad datagrams are counted and dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wifi_trilat_core::{SensorReport, Tracker};

use crate::error::NodeError;
use crate::wire::ReportCodec;

/// Default bound on the number of tracked peers.
pub const DEFAULT_MAX_PEERS: usize = 16;

/// Bookkeeping for one peer sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStats {
    /// First datagram that decoded.
    pub first_seen: Instant,
    /// Most recent datagram that decoded.
    pub last_seen: Instant,
    /// Reports decoded from this peer.
    pub reports: u64,
    /// Datagrams from this peer that failed to decode after it registered.
    pub decode_failures: u64,
}

impl PeerStats {
    fn new(now: Instant) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            reports: 0,
            decode_failures: 0,
        }
    }
}

/// What [`PeerRegistry::record_reports`] did with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Already registered.
    Known,
    /// Newly registered, possibly displacing the least recently seen peer.
    New {
        /// Peer dropped to make room, if the registry was full.
        evicted: Option<SocketAddr>,
    },
}

/// Peers the coordinator has heard from, keyed by source address.
///
/// Only sources whose datagrams decode are registered, and at most
/// `max_peers` are kept. Undecodable datagrams from unknown sources only
/// bump an aggregate counter.
#[derive(Debug)]
pub struct PeerRegistry {
    peers: HashMap<SocketAddr, PeerStats>,
    max_peers: usize,
    decode_failures: u64,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::with_max_peers(DEFAULT_MAX_PEERS)
    }
}

impl PeerRegistry {
    /// Registry bounded to [`DEFAULT_MAX_PEERS`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding at most `max_peers` peers (at least one).
    pub fn with_max_peers(max_peers: usize) -> Self {
        let max_peers = max_peers.max(1);
        Self {
            peers: HashMap::with_capacity(max_peers.min(DEFAULT_MAX_PEERS)),
            max_peers,
            decode_failures: 0,
        }
    }

    /// Count `reports` decoded reports from `src`.
    ///
    /// A new source past the bound evicts the least recently seen peer.
    pub fn record_reports(&mut self, src: SocketAddr, reports: usize, now: Instant) -> Admission {
        if let Some(stats) = self.peers.get_mut(&src) {
            stats.reports += reports as u64;
            stats.last_seen = now;
            return Admission::Known;
        }

        let mut evicted = None;
        if self.peers.len() >= self.max_peers {
            if let Some(oldest) = self.least_recently_seen() {
                self.peers.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        let mut stats = PeerStats::new(now);
        stats.reports = reports as u64;
        self.peers.insert(src, stats);
        Admission::New { evicted }
    }

    fn least_recently_seen(&self) -> Option<SocketAddr> {
        self.peers
            .iter()
            .min_by_key(|(_, stats)| stats.last_seen)
            .map(|(addr, _)| *addr)
    }

    /// Count a datagram from `src` that failed to decode. Returns the total
    /// number of failed datagrams.
    pub fn record_failure(&mut self, src: SocketAddr) -> u64 {
        self.decode_failures += 1;
        if let Some(stats) = self.peers.get_mut(&src) {
            stats.decode_failures += 1;
        }
        self.decode_failures
    }

    /// Stats for one registered peer.
    pub fn get(&self, src: &SocketAddr) -> Option<&PeerStats> {
        self.peers.get(src)
    }

    /// Failed datagrams from any source.
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    /// Bound on registered peers.
    pub fn max_peers(&self) -> usize {
        self.max_peers
    }

    /// Registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peer has registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Registered peers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&SocketAddr, &PeerStats)> {
        self.peers.iter()
    }
}

/// Receives peer report datagrams on the coordinator.
pub struct PeerListener {
    socket: UdpSocket,
    tracker: Arc<Tracker>,
    registry: PeerRegistry,
}

impl PeerListener {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr, tracker: Arc<Tracker>) -> Result<Self, NodeError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| NodeError::Bind { addr, source })?;
        Ok(Self::from_socket(socket, tracker))
    }

    /// Wrap an already bound socket.
    pub fn from_socket(socket: UdpSocket, tracker: Arc<Tracker>) -> Self {
        Self {
            socket,
            tracker,
            registry: PeerRegistry::new(),
        }
    }

    /// Bound the peer registry to `max_peers` entries.
    #[must_use]
    pub fn with_max_peers(mut self, max_peers: usize) -> Self {
        self.registry = PeerRegistry::with_max_peers(max_peers);
        self
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Peers heard from so far.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Handle one datagram. Returns the number of reports accepted into the
    /// aggregation table. Public for unit testing.
    pub fn handle_packet(&mut self, src: SocketAddr, data: &[u8], now: Instant) -> usize {
        let reports = match ReportCodec::decode_datagram(data) {
            Ok(reports) => reports,
            Err(e) => {
                let failures = self.registry.record_failure(src);
                warn!(%src, failures, "dropping peer datagram: {e}");
                return 0;
            }
        };

        if let Admission::New { evicted } = self.registry.record_reports(src, reports.len(), now) {
            if let Some(first) = reports.first() {
                info!(%src, sensor = %first.sensor, "new peer sensor");
            }
            if let Some(old) = evicted {
                warn!(
                    %old,
                    max_peers = self.registry.max_peers(),
                    "peer limit reached, forgetting least recent peer"
                );
            }
        }

        let accepted = reports
            .iter()
            .filter(|r| self.tracker.on_peer_report(r, now).is_accepted())
            .count();
        debug!(%src, received = reports.len(), accepted, "peer datagram");
        accepted
    }

    /// Receive until shutdown. Returns the registry for a final summary.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PeerRegistry {
        let mut buf = [0u8; 2048];
        loop {
            let received = tokio::select! {
                r = self.socket.recv_from(&mut buf) => r,
                _ = shutdown.changed() => break,
            };
            match received {
                Ok((len, src)) => {
                    self.handle_packet(src, &buf[..len], Instant::now());
                }
                Err(e) => {
                    warn!("UDP recv error: {e}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
        self.registry
    }
}

/// Sends a sensor's fresh sightings to the coordinator.
pub struct ReportSender {
    socket: UdpSocket,
    coordinator: SocketAddr,
}

impl ReportSender {
    /// Bind an ephemeral socket for talking to `coordinator`.
    pub async fn connect(coordinator: SocketAddr) -> Result<Self, NodeError> {
        let local: SocketAddr = if coordinator.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| NodeError::Bind { addr: local, source })?;
        Ok(Self {
            socket,
            coordinator,
        })
    }

    /// Where reports are sent.
    pub fn coordinator(&self) -> SocketAddr {
        self.coordinator
    }

    /// Send all `reports`, split across datagrams as needed. Returns the
    /// number of datagrams sent.
    pub async fn send(&self, reports: &[SensorReport]) -> Result<usize, NodeError> {
        let datagrams = ReportCodec::encode_datagrams(reports);
        for datagram in &datagrams {
            self.socket.send_to(datagram, self.coordinator).await?;
        }
        Ok(datagrams.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_trilat_core::{MacAddress, Position, TrackerConfig};

    fn report(last: u8, signal: i32, x: f64, y: f64) -> SensorReport {
        SensorReport::new(
            MacAddress([0xf0, 0x18, 0x98, 0x00, 0x00, last]),
            signal,
            Position::new(x, y),
        )
    }

    fn datagram(reports: &[SensorReport]) -> Vec<u8> {
        ReportCodec::encode_datagrams(reports).remove(0)
    }

    async fn listener() -> PeerListener {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        PeerListener::from_socket(socket, Arc::new(Tracker::new(&TrackerConfig::default())))
    }

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([192, 168, 4, 2], port))
    }

    #[tokio::test]
    async fn valid_datagram_feeds_tracker() {
        let mut l = listener().await;
        let now = Instant::now();
        let accepted = l.handle_packet(
            peer(1),
            &datagram(&[report(1, -60, 10.0, 0.0), report(2, -70, 10.0, 0.0)]),
            now,
        );

        assert_eq!(accepted, 2);
        assert_eq!(l.tracker.aggregation_count(), 2);
        let stats = l.registry().get(&peer(1)).unwrap();
        assert_eq!(stats.reports, 2);
        assert_eq!(stats.decode_failures, 0);
    }

    #[tokio::test]
    async fn bad_datagram_is_counted_not_ingested() {
        let mut l = listener().await;
        let now = Instant::now();
        assert_eq!(l.handle_packet(peer(1), &[0xff, 0xfe, 0xfd, 0xfc, 0x00], now), 0);
        assert_eq!(l.handle_packet(peer(1), &[], now), 0);

        assert_eq!(l.tracker.aggregation_count(), 0);
        assert!(l.registry().get(&peer(1)).is_none());
        assert_eq!(l.registry().decode_failures(), 2);

        l.handle_packet(peer(1), &datagram(&[report(1, -60, 10.0, 0.0)]), now);
        l.handle_packet(peer(1), &[0x00], now);
        assert_eq!(l.registry().get(&peer(1)).unwrap().decode_failures, 1);
        assert_eq!(l.registry().decode_failures(), 3);
    }

    #[tokio::test]
    async fn garbage_from_many_sources_registers_nothing() {
        let mut l = listener().await;
        let now = Instant::now();
        for port in 0..20_000u16 {
            l.handle_packet(peer(port), &[0xde, 0xad], now);
        }
        assert!(l.registry().is_empty());
        assert_eq!(l.registry().decode_failures(), 20_000);
    }

    #[tokio::test]
    async fn registry_is_bounded_by_max_peers() {
        let mut l = listener().await.with_max_peers(3);
        let t0 = Instant::now();
        for port in 0..100u16 {
            let now = t0 + Duration::from_millis(u64::from(port));
            l.handle_packet(peer(port), &datagram(&[report(1, -60, 10.0, 0.0)]), now);
        }
        assert_eq!(l.registry().len(), 3);
        assert_eq!(l.registry().max_peers(), 3);
        // The three most recent sources survive.
        for port in 97..100u16 {
            assert!(l.registry().get(&peer(port)).is_some());
        }
    }

    #[tokio::test]
    async fn group_addresses_are_not_accepted() {
        let mut l = listener().await;
        let mut multicast = report(1, -60, 0.0, 0.0);
        multicast.address = MacAddress([0x33, 0x33, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(l.handle_packet(peer(1), &datagram(&[multicast]), Instant::now()), 0);
        assert_eq!(l.registry().get(&peer(1)).unwrap().reports, 1);
    }

    #[tokio::test]
    async fn peers_tracked_separately() {
        let mut l = listener().await;
        let now = Instant::now();
        l.handle_packet(peer(1), &datagram(&[report(1, -60, 10.0, 0.0)]), now);
        l.handle_packet(peer(2), &datagram(&[report(1, -65, 0.0, 10.0)]), now);
        l.handle_packet(peer(2), &datagram(&[report(3, -65, 0.0, 10.0)]), now);

        assert_eq!(l.registry().len(), 2);
        assert_eq!(l.registry().get(&peer(2)).unwrap().reports, 2);
        assert_eq!(l.tracker.window(&report(1, 0, 0.0, 0.0).address).unwrap().len(), 2);
    }

    #[test]
    fn first_report_is_flagged_once() {
        let mut registry = PeerRegistry::new();
        let now = Instant::now();
        registry.record_failure(peer(9));
        assert!(registry.is_empty());
        assert_eq!(
            registry.record_reports(peer(9), 3, now),
            Admission::New { evicted: None }
        );
        assert_eq!(registry.record_reports(peer(9), 1, now), Admission::Known);
        assert_eq!(registry.get(&peer(9)).unwrap().reports, 4);
    }

    #[test]
    fn eviction_drops_least_recently_seen() {
        let mut registry = PeerRegistry::with_max_peers(2);
        let t0 = Instant::now();
        registry.record_reports(peer(1), 1, t0);
        registry.record_reports(peer(2), 1, t0 + Duration::from_millis(5));
        registry.record_reports(peer(1), 1, t0 + Duration::from_millis(10));

        assert_eq!(
            registry.record_reports(peer(3), 1, t0 + Duration::from_millis(15)),
            Admission::New { evicted: Some(peer(2)) }
        );
        assert!(registry.get(&peer(1)).is_some());
        assert!(registry.get(&peer(2)).is_none());
    }

    #[tokio::test]
    async fn loopback_roundtrip() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let tracker = Arc::new(Tracker::new(&TrackerConfig::default()));
        let listener = PeerListener::from_socket(socket, Arc::clone(&tracker));
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(listener.run(rx));

        let sender = ReportSender::connect(addr).await.unwrap();
        let sent = sender
            .send(&[report(5, -61, 10.0, 0.0), report(6, -62, 10.0, 0.0)])
            .await
            .unwrap();
        assert_eq!(sent, 1);

        let deadline = Instant::now() + Duration::from_secs(2);
        while tracker.aggregation_count() < 2 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        let registry = task.await.unwrap();

        assert_eq!(tracker.aggregation_count(), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().next().unwrap().1.reports, 2);
    }
}
