//! Full node runs over loopback UDP.

use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::UdpSocket;
use wifi_trilat_core::{Anonymizer, MacAddress, Position, SensorReport, Sha256Anonymizer};
use wifi_trilat_node::peer::ReportSender;
use wifi_trilat_node::publish::PositionPayload;
use wifi_trilat_node::wire::ReportCodec;
use wifi_trilat_node::{start, NodeConfig, PublishTarget, Role};

const PHONE: MacAddress = MacAddress([0x5c, 0xe9, 0x1e, 0x4a, 0x10, 0x07]);

async fn recv_within(socket: &UdpSocket, secs: u64) -> Vec<u8> {
    let mut buf = [0u8; 2048];
    let n = tokio::time::timeout(Duration::from_secs(secs), socket.recv(&mut buf))
        .await
        .expect("timed out waiting for datagram")
        .unwrap();
    buf[..n].to_vec()
}

#[tokio::test]
async fn coordinator_publishes_trilaterated_position() {
    let publish = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut cfg = NodeConfig {
        role: Role::Coordinator,
        listen: "127.0.0.1:0".parse().unwrap(),
        publish: PublishTarget::Udp(publish.local_addr().unwrap()),
        topic: "test/positions".to_string(),
        ..NodeConfig::default()
    };
    cfg.tracker.position = Position::new(0.0, 0.0);
    cfg.tracker.sweep_interval_ms = 200;
    cfg.tracker.min_samples = 3;

    let capture = BufReader::new(&b"5c:e9:1e:4a:10:07 -66\n"[..]);
    let node = start(cfg, capture).await.unwrap();
    let listen = node.listen_addr().unwrap();

    let sender = ReportSender::connect(listen).await.unwrap();
    sender
        .send(&[
            SensorReport::new(PHONE, -66, Position::new(10.0, 0.0)),
            SensorReport::new(PHONE, -66, Position::new(0.0, 10.0)),
        ])
        .await
        .unwrap();

    let payload: PositionPayload = serde_json::from_slice(&recv_within(&publish, 5).await).unwrap();
    node.shutdown().await;

    assert_eq!(payload.topic, "test/positions");
    assert_eq!(payload.id, Sha256Anonymizer.anonymize(&PHONE));
    assert_eq!(payload.x, 5.0);
    assert_eq!(payload.y, 5.0);
    assert!(payload.timestamp > 0);
}

#[tokio::test]
async fn sensor_forwards_fresh_sightings() {
    let coordinator = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut cfg = NodeConfig {
        role: Role::Sensor,
        coordinator: Some(coordinator.local_addr().unwrap()),
        ..NodeConfig::default()
    };
    cfg.tracker.position = Position::new(10.0, 0.0);
    cfg.tracker.report_interval_ms = 100;

    let capture = BufReader::new(
        &b"5c:e9:1e:4a:10:07 -70\n\
           33:33:00:00:00:01 -40\n\
           garbage\n"[..],
    );
    let node = start(cfg, capture).await.unwrap();
    assert!(node.listen_addr().is_none());

    let reports = ReportCodec::decode_datagram(&recv_within(&coordinator, 5).await).unwrap();
    node.shutdown().await;

    assert_eq!(
        reports,
        vec![SensorReport::new(PHONE, -70, Position::new(10.0, 0.0))]
    );
}

#[tokio::test]
async fn invalid_config_is_refused() {
    let cfg = NodeConfig {
        role: Role::Sensor,
        coordinator: None,
        ..NodeConfig::default()
    };
    let result = start(cfg, BufReader::new(&b""[..])).await;
    assert!(matches!(result, Err(wifi_trilat_node::NodeError::Config(_))));
}
