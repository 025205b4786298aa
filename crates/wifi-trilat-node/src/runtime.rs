//! Node runtime: the tokio tasks behind one coordinator or sensor.
//!
//! | Task      | Role        | Period              |
//! |-----------|-------------|---------------------|
//! | capture   | both        | per input line      |
//! | peers     | coordinator | per datagram        |
//! | sweep     | coordinator | `sweep_interval`    |
//! | report    | sensor      | `report_interval`   |
//!
//! All tasks share one [`Tracker`] and stop when the shutdown channel
//! fires.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncBufRead;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use wifi_trilat_core::{
    PositionSink, PositionSolver, Sha256Anonymizer, SweepDriver, Tracker,
};

use crate::capture::run_capture;
use crate::config::{NodeConfig, Role};
use crate::error::NodeError;
use crate::peer::{PeerListener, ReportSender};
use crate::publish::open_sink;

/// Sweep driver as wired by the node.
pub type NodeSweepDriver = SweepDriver<Sha256Anonymizer, Box<dyn PositionSink>>;

/// A started node. Dropping it without [`NodeHandle::shutdown`] leaves the
/// tasks running until the runtime stops.
pub struct NodeHandle {
    role: Role,
    tracker: Arc<Tracker>,
    listen_addr: Option<SocketAddr>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeHandle {
    /// Role the node was started in.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Tracking state shared by the tasks.
    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Bound peer listener address (coordinator only).
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        self.listen_addr
    }

    /// Signal every task to stop and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("node task failed: {e}");
            }
        }
        info!(role = %self.role, "node stopped");
    }
}

/// Validate `config`, open the publish sink and sockets, and spawn the
/// tasks for the configured role.
pub async fn start<R>(config: NodeConfig, capture: R) -> Result<NodeHandle, NodeError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    config.validate()?;

    let tracker = Arc::new(Tracker::new(&config.tracker));
    let (shutdown, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();
    let mut listen_addr = None;

    info!(
        role = %config.role,
        position = %config.tracker.position,
        capacity = config.tracker.capacity,
        timeout_ms = config.tracker.staleness_timeout_ms,
        "starting node"
    );

    match config.role {
        Role::Coordinator => {
            let listener = PeerListener::bind(config.listen, Arc::clone(&tracker))
                .await?
                .with_max_peers(config.max_peers);
            let addr = listener.local_addr()?;
            info!(%addr, "listening for peer reports");
            listen_addr = Some(addr);
            tasks.push(tokio::spawn(peer_task(listener, shutdown_rx.clone())));

            let sink = open_sink(config.publish, &config.topic)?;
            let driver = SweepDriver::new(
                PositionSolver::new(config.tracker.distance),
                Sha256Anonymizer,
                sink,
            )
            .with_local_fold(true);
            info!(publish = %config.publish, topic = %config.topic, "publishing positions");

            tasks.push(tokio::spawn(sweep_loop(
                Arc::clone(&tracker),
                Arc::new(driver),
                config.tracker.sweep_interval(),
                shutdown_rx.clone(),
            )));
        }
        Role::Sensor => {
            let coordinator = config.coordinator.ok_or_else(|| {
                wifi_trilat_core::ConfigError::invalid_value(
                    "coordinator",
                    "required when role is sensor",
                )
            })?;
            let sender = ReportSender::connect(coordinator).await?;
            info!(%coordinator, "reporting to coordinator");
            tasks.push(tokio::spawn(report_loop(
                Arc::clone(&tracker),
                sender,
                config.tracker.report_interval(),
                shutdown_rx.clone(),
            )));
        }
    }

    let capture_tracker = Arc::clone(&tracker);
    let capture_rx = shutdown_rx;
    tasks.push(tokio::spawn(async move {
        let stats = run_capture(capture, capture_tracker, capture_rx).await;
        debug!(?stats, "capture task finished");
    }));

    Ok(NodeHandle {
        role: config.role,
        tracker,
        listen_addr,
        shutdown,
        tasks,
    })
}

async fn peer_task(listener: PeerListener, shutdown: watch::Receiver<bool>) {
    let registry = listener.run(shutdown).await;
    info!(
        peers = registry.len(),
        decode_failures = registry.decode_failures(),
        "peer listener stopped"
    );
    for (addr, stats) in registry.iter() {
        info!(
            %addr,
            reports = stats.reports,
            decode_failures = stats.decode_failures,
            "peer summary"
        );
    }
}

/// Run a sweep every `period` until shutdown.
///
/// The first sweep happens one period after start. Each sweep runs on the
/// blocking pool since sinks write synchronously.
pub async fn sweep_loop(
    tracker: Arc<Tracker>,
    driver: Arc<NodeSweepDriver>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let tracker = Arc::clone(&tracker);
        let driver = Arc::clone(&driver);
        let result =
            tokio::task::spawn_blocking(move || driver.run_once(&tracker, Instant::now())).await;
        if let Err(e) = result {
            error!("sweep task panicked: {e}");
        }
    }
}

/// Forward fresh local sightings to the coordinator every `period` until
/// shutdown.
pub async fn report_loop(
    tracker: Arc<Tracker>,
    sender: ReportSender,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let reports = tracker.fresh_reports(Instant::now());
        if reports.is_empty() {
            continue;
        }
        match sender.send(&reports).await {
            Ok(datagrams) => {
                debug!(
                    reports = reports.len(),
                    datagrams,
                    coordinator = %sender.coordinator(),
                    "reports sent"
                );
            }
            Err(e) => warn!(coordinator = %sender.coordinator(), "failed to send reports: {e}"),
        }
    }
}
