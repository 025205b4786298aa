//! wifi-trilat node.
//!
//! Reads `aa:bb:cc:dd:ee:ff <rssi>` capture lines on stdin and runs as the
//! coordinator or as a sensor.
//!
//! Usage:
//!   sniffer | trilat-node --role coordinator --x 5 --y 5 --publish stdout
//!   sniffer | trilat-node --role sensor --x 10 --y 0 --coordinator 192.168.4.1:4210

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use wifi_trilat_core::Position;
use wifi_trilat_node::{start, NodeConfig, NodeError, PublishTarget, Role};

/// Device tracking and RSSI trilateration node.
#[derive(Parser, Debug)]
#[command(name = "trilat-node", version, about)]
struct Args {
    /// JSON configuration file. Command-line flags override its values.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Node role: coordinator or sensor.
    #[arg(long)]
    role: Option<Role>,

    /// X coordinate of this node.
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,

    /// Y coordinate of this node.
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,

    /// Address to receive peer reports on (coordinator).
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Coordinator address to send reports to (sensor).
    #[arg(long)]
    coordinator: Option<SocketAddr>,

    /// Most peer sensors tracked by the coordinator.
    #[arg(long)]
    max_peers: Option<usize>,

    /// Where to publish positions: stdout or udp:<host>:<port>.
    #[arg(long)]
    publish: Option<PublishTarget>,

    /// Topic attached to published positions.
    #[arg(long)]
    topic: Option<String>,

    /// Maximum tracked devices per table.
    #[arg(long)]
    capacity: Option<usize>,

    /// Staleness timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Sweep interval in milliseconds (coordinator).
    #[arg(long, value_name = "MS")]
    sweep_ms: Option<u64>,

    /// Report interval in milliseconds (sensor).
    #[arg(long, value_name = "MS")]
    report_ms: Option<u64>,

    /// Distinct sensor positions required before solving (2 or 3).
    #[arg(long)]
    min_samples: Option<usize>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(&self, cfg: &mut NodeConfig) {
        if let Some(role) = self.role {
            cfg.role = role;
        }
        if self.x.is_some() || self.y.is_some() {
            let Position { x, y } = cfg.tracker.position;
            cfg.tracker.position = Position::new(self.x.unwrap_or(x), self.y.unwrap_or(y));
        }
        if let Some(listen) = self.listen {
            cfg.listen = listen;
        }
        if let Some(coordinator) = self.coordinator {
            cfg.coordinator = Some(coordinator);
        }
        if let Some(n) = self.max_peers {
            cfg.max_peers = n;
        }
        if let Some(publish) = self.publish {
            cfg.publish = publish;
        }
        if let Some(topic) = &self.topic {
            cfg.topic = topic.clone();
        }
        if let Some(capacity) = self.capacity {
            cfg.tracker.capacity = capacity;
        }
        if let Some(ms) = self.timeout_ms {
            cfg.tracker.staleness_timeout_ms = ms;
        }
        if let Some(ms) = self.sweep_ms {
            cfg.tracker.sweep_interval_ms = ms;
        }
        if let Some(ms) = self.report_ms {
            cfg.tracker.report_interval_ms = ms;
        }
        if let Some(n) = self.min_samples {
            cfg.tracker.min_samples = n;
        }
    }
}

fn load_config(args: &Args) -> Result<NodeConfig, NodeError> {
    let mut cfg = match &args.config {
        Some(path) => NodeConfig::from_json(path)?,
        None => NodeConfig::default(),
    };
    args.apply(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

async fn run(cfg: NodeConfig) -> Result<(), NodeError> {
    let node = start(cfg, BufReader::new(tokio::io::stdin())).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    node.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays clean for published positions.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let cfg = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e}");
            process::exit(2);
        }
    };

    if args.print_config {
        match serde_json::to_string_pretty(&cfg) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("cannot serialize configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(cfg).await {
        error!("{e}");
        process::exit(1);
    }
}
