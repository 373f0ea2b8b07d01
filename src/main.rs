use clap::Parser;
use peer_kv::config::{
    self, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HTTP_PORT, DEFAULT_REPLICATION_TIMEOUT, NodeConfig,
};
use peer_kv::membership::types::ClusterSecret;
use peer_kv::node::ClusterNode;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Shared cluster secret. Only nodes presenting the same secret are admitted.
    #[arg(env = "PEER_KV_SECRET", hide_env_values = true)]
    secret: String,

    /// Address the HTTP API listens on.
    #[arg(long, env = "PEER_KV_HTTP_BIND", default_value_t = config::default_http_bind())]
    http_bind: SocketAddr,

    /// Address heartbeats are received on.
    #[arg(long, env = "PEER_KV_DISCOVERY_BIND", default_value_t = config::default_discovery_bind())]
    discovery_bind: SocketAddr,

    /// Where heartbeats are sent.
    #[arg(long, env = "PEER_KV_BROADCAST_ADDR", default_value_t = config::default_broadcast_addr())]
    broadcast_addr: SocketAddr,

    /// Milliseconds between heartbeats.
    #[arg(long, env = "PEER_KV_HEARTBEAT_MS", default_value_t = DEFAULT_HEARTBEAT_INTERVAL.as_millis() as u64)]
    heartbeat_ms: u64,

    /// Per-peer timeout for replicated writes, in milliseconds.
    #[arg(long, env = "PEER_KV_REPLICATION_TIMEOUT_MS", default_value_t = DEFAULT_REPLICATION_TIMEOUT.as_millis() as u64)]
    replication_timeout_ms: u64,

    /// HTTP port assumed for peers that do not announce one.
    #[arg(long, env = "PEER_KV_PEER_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    peer_http_port: u16,
}

impl From<Cli> for NodeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            secret: ClusterSecret::new(cli.secret),
            http_bind: cli.http_bind,
            discovery_bind: cli.discovery_bind,
            broadcast_addr: cli.broadcast_addr,
            heartbeat_interval: Duration::from_millis(cli.heartbeat_ms),
            replication_timeout: Duration::from_millis(cli.replication_timeout_ms),
            peer_http_port: cli.peer_http_port,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config: NodeConfig = Cli::parse().into();

    tracing::info!("Starting peer-kv node");

    let node = match ClusterNode::bind(config).await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };

    tracing::info!("Press Ctrl+C to shutdown");

    if let Err(e) = node.run(shutdown_signal()).await {
        tracing::error!("Node terminated: {:#}", e);
        return Err(e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
