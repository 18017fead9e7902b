mod events;
mod probe;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mesh_protocol::{Mesh, MeshConfig, NodeId};
use mesh_transport::{UdpConfig, UdpTransport};
use tokio::task::JoinSet;

use events::{emit, EventStarted};
use probe::Probe;

/// How often expired identifiers are evicted from the dedup cache.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "meshd", about = "Mesh node daemon", version)]
struct Cli {
    /// Node address (UUID). Random if omitted.
    #[arg(long)]
    identifier: Option<NodeId>,

    /// UDP address to listen on.
    #[arg(long, default_value = "0.0.0.0:7700")]
    listen: SocketAddr,

    /// UDP peer to flood to (repeatable).
    #[arg(long = "peer")]
    peers: Vec<SocketAddr>,

    /// Send an echo request to this node (repeatable).
    #[arg(long)]
    ping: Vec<NodeId>,

    /// Measure the hop count to this node (repeatable).
    #[arg(long)]
    probe_path: Vec<NodeId>,

    /// Ask this node for its link layers (repeatable).
    #[arg(long)]
    probe_links: Vec<NodeId>,

    /// Hop budget for path probes.
    #[arg(long, default_value = "8")]
    hop_budget: u8,

    /// Probe timeout in milliseconds.
    #[arg(long, default_value = "5000")]
    timeout: u64,

    /// Log at info level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let identifier = cli.identifier.unwrap_or_else(NodeId::random);
    eprintln!("meshd v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Identifier: {identifier}");
    eprintln!();

    let mesh = Mesh::new(identifier, MeshConfig::new());
    let udp = UdpTransport::bind(UdpConfig::new(cli.listen).peers(cli.peers.iter().copied()))
        .await
        .with_context(|| format!("binding UDP link on {}", cli.listen))?;
    let listen = udp.local_addr();
    mesh.attach(Arc::new(udp));

    emit(&EventStarted {
        event: "started",
        id: identifier,
        listen: listen.to_string(),
        peers: cli.peers.iter().map(ToString::to_string).collect(),
    });

    tokio::spawn({
        let mesh = mesh.clone();
        async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                mesh.purge_seen();
                tracing::debug!("dedup cache holds {} identifiers", mesh.seen_len());
            }
        }
    });

    let timeout = Duration::from_millis(cli.timeout);
    let requests = cli
        .ping
        .iter()
        .map(|target| (Probe::Echo, *target))
        .chain(cli.probe_path.iter().map(|target| {
            (
                Probe::Path {
                    hop_budget: cli.hop_budget,
                },
                *target,
            )
        }))
        .chain(cli.probe_links.iter().map(|target| (Probe::Links, *target)));

    let mut probes = JoinSet::new();
    for (probe, target) in requests {
        probes.spawn(probe::run(mesh.control(), probe, target, timeout));
    }
    while let Some(result) = probes.join_next().await {
        if let Err(e) = result {
            tracing::warn!("probe task failed: {e}");
        }
    }

    tracing::info!("forwarding until Ctrl+C");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    eprintln!("\nCtrl+C received, shutting down...");
    Ok(())
}
