use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::info;

use super::codec::{self, MAX_HEARTBEAT_SIZE};
use super::registry::MembershipRegistry;
use super::types::{Heartbeat, NodeIdentity, PeerAddress};
use crate::config::NodeConfig;

pub struct DiscoveryService {
    pub identity: NodeIdentity,
    members: Arc<MembershipRegistry>,
    listener: UdpSocket,
    broadcaster: UdpSocket,
    broadcast_addr: SocketAddr,
    heartbeat_interval: Duration,
    peer_http_port: u16,
}

impl DiscoveryService {
    /// Binds both discovery sockets.
    ///
    /// Any failure here is fatal for the node: without these sockets it can
    /// neither be found nor find anyone.
    pub async fn bind(
        identity: NodeIdentity,
        members: Arc<MembershipRegistry>,
        config: &NodeConfig,
    ) -> Result<Arc<Self>> {
        anyhow::ensure!(
            !config.heartbeat_interval.is_zero(),
            "heartbeat interval must be greater than zero"
        );
        codec::encode(&identity.heartbeat())
            .context("cluster secret does not fit in a heartbeat datagram")?;

        let listener = UdpSocket::bind(config.discovery_bind)
            .await
            .with_context(|| format!("failed to bind discovery listener on {}", config.discovery_bind))?;

        let unspecified = match config.broadcast_addr.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let broadcaster = UdpSocket::bind(SocketAddr::new(unspecified, 0))
            .await
            .context("failed to bind heartbeat broadcaster")?;
        if config.broadcast_addr.is_ipv4() {
            broadcaster
                .set_broadcast(true)
                .context("failed to enable SO_BROADCAST on heartbeat socket")?;
        }

        info!(
            "Discovery listening on {}, broadcasting to {} every {:?}",
            listener.local_addr()?,
            config.broadcast_addr,
            config.heartbeat_interval
        );

        Ok(Arc::new(Self {
            identity,
            members,
            listener,
            broadcaster,
            broadcast_addr: config.broadcast_addr,
            heartbeat_interval: config.heartbeat_interval,
            peer_http_port: config.peer_http_port,
        }))
    }

    pub fn listener_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn members(&self) -> &Arc<MembershipRegistry> {
        &self.members
    }

    /// Receives heartbeats until shutdown.
    ///
    /// Undecodable datagrams are dropped. A receive error on the socket ends
    /// the loop with an error, which takes the node down.
    pub async fn listen_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut buf = vec![0u8; MAX_HEARTBEAT_SIZE];

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Discovery listener stopped");
                    return Ok(());
                }
                received = self.listener.recv_from(&mut buf) => {
                    let (len, src) = received.context("discovery socket receive failed")?;
                    self.handle_datagram(&buf[..len], src).await;
                }
            }
        }
    }

    /// Broadcasts this node's heartbeat every interval until shutdown.
    pub async fn broadcast_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut interval = tokio::time::interval(self.heartbeat_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Heartbeat broadcaster stopped");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.send_heartbeat().await;
                }
            }
        }
    }

    async fn send_heartbeat(&self) {
        let encoded = match codec::encode(&self.identity.heartbeat()) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!("Failed to encode heartbeat: {}", e);
                return;
            }
        };

        match self.broadcaster.send_to(&encoded, self.broadcast_addr).await {
            Ok(_) => tracing::trace!("Sent heartbeat to {}", self.broadcast_addr),
            Err(e) => tracing::warn!("Failed to send heartbeat to {}: {}", self.broadcast_addr, e),
        }
    }

    pub async fn handle_datagram(&self, bytes: &[u8], src: SocketAddr) -> bool {
        match codec::decode(bytes) {
            Ok(heartbeat) => self.admit(&heartbeat, src).await,
            Err(e) => {
                tracing::debug!("Discarding datagram from {}: {}", src, e);
                false
            }
        }
    }

    /// Applies the admission rule to a decoded heartbeat.
    ///
    /// The sender is admitted iff the secret matches, the id is not ours and
    /// its address is not already known. Returns `true` on a new admission.
    pub async fn admit(&self, heartbeat: &Heartbeat, src: SocketAddr) -> bool {
        if heartbeat.secret != self.identity.secret {
            tracing::debug!("Discarding heartbeat from {}: secret mismatch", src);
            return false;
        }

        if heartbeat.id == self.identity.id {
            tracing::trace!("Ignoring own heartbeat from {}", src);
            return false;
        }

        let peer = PeerAddress::from_heartbeat(src, heartbeat, self.peer_http_port);
        let inserted = self.members.insert_if_absent(peer.clone()).await;

        if inserted {
            info!("Discovered new peer: {} (node {})", peer, heartbeat.id);
            info!("Cluster size now: {} peers", self.members.len().await);
        }

        inserted
    }
}
