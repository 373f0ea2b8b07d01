//! Node Runtime
//!
//! Wires the subsystems of one cluster node together: it owns the shared
//! service context, binds every socket up front (so bind failures surface
//! before anything runs), and supervises the three long-lived tasks:
//! discovery listener, heartbeat broadcaster and HTTP server.

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::info;

use crate::config::NodeConfig;
use crate::membership::handlers::handle_status;
use crate::membership::registry::MembershipRegistry;
use crate::membership::service::DiscoveryService;
use crate::membership::types::NodeIdentity;
use crate::storage::handlers::{handle_peer_write, handle_read, handle_write};
use crate::storage::memory::KvStore;
use crate::storage::protocol::{ENDPOINT_PEER_WRITE, ENDPOINT_READ, ENDPOINT_WRITE};
use crate::storage::replication::Replicator;

/// State shared by every HTTP handler.
pub struct ClusterContext {
    pub identity: NodeIdentity,
    pub members: Arc<MembershipRegistry>,
    pub store: Arc<KvStore>,
    pub replicator: Replicator,
}

pub fn build_router(ctx: Arc<ClusterContext>) -> Router {
    Router::new()
        .route("/", get(handle_status))
        .route(ENDPOINT_READ, get(handle_read))
        .route(ENDPOINT_WRITE, post(handle_write))
        .route(ENDPOINT_PEER_WRITE, post(handle_peer_write))
        .layer(Extension(ctx))
}

pub struct ClusterNode {
    context: Arc<ClusterContext>,
    discovery: Arc<DiscoveryService>,
    http_listener: TcpListener,
}

impl ClusterNode {
    /// Binds the HTTP listener and both discovery sockets.
    pub async fn bind(config: NodeConfig) -> Result<Self> {
        let http_listener = TcpListener::bind(config.http_bind)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {}", config.http_bind))?;
        let http_addr = http_listener.local_addr()?;

        let identity = NodeIdentity::new(config.secret.clone(), http_addr.port());
        let members = Arc::new(MembershipRegistry::new());
        let discovery = DiscoveryService::bind(identity.clone(), members.clone(), &config).await?;
        let replicator = Replicator::new(config.replication_timeout)
            .context("failed to build replication client")?;

        let context = Arc::new(ClusterContext {
            identity,
            members,
            store: Arc::new(KvStore::new()),
            replicator,
        });

        info!("Node {} bound HTTP API on {}", context.identity.id, http_addr);

        Ok(Self {
            context,
            discovery,
            http_listener,
        })
    }

    pub fn context(&self) -> Arc<ClusterContext> {
        self.context.clone()
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    pub fn discovery_addr(&self) -> Result<SocketAddr> {
        self.discovery.listener_addr()
    }

    /// Runs the node until `shutdown` resolves or an essential task fails.
    ///
    /// Either way the shutdown signal is then sent to every task, in-flight
    /// HTTP requests are drained, and the first task error (if any) is returned.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        tasks.spawn(self.discovery.clone().listen_loop(shutdown_rx.clone()));
        tasks.spawn(self.discovery.clone().broadcast_loop(shutdown_rx.clone()));

        let app = build_router(self.context.clone());
        let mut server_shutdown = shutdown_rx.clone();
        let http_listener = self.http_listener;
        tasks.spawn(async move {
            axum::serve(http_listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.changed().await;
                })
                .await
                .context("HTTP server failed")?;
            info!("HTTP server stopped");
            Ok(())
        });

        let mut result = Ok(());
        tokio::select! {
            _ = shutdown => {
                info!("Shutdown requested, stopping node {}", self.context.identity.id);
            }
            Some(joined) = tasks.join_next() => {
                result = flatten(joined);
                match &result {
                    Ok(()) => tracing::warn!("A node task exited early, shutting down"),
                    Err(e) => tracing::error!("Fatal node error: {:#}", e),
                }
            }
        }

        let _ = shutdown_tx.send(true);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = flatten(joined) {
                tracing::error!("Node task failed during shutdown: {:#}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }
}

fn flatten(joined: Result<Result<()>, JoinError>) -> Result<()> {
    joined.context("node task panicked or was cancelled")?
}
