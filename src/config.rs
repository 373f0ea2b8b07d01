//! Node configuration.
//!
//! Every node in a cluster must agree on the secret and, unless peers announce
//! their own HTTP port, on the HTTP port. Everything else is local.

use crate::membership::types::ClusterSecret;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_DISCOVERY_PORT: u16 = 8888;
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_REPLICATION_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub secret: ClusterSecret,
    /// Address the HTTP API listens on.
    pub http_bind: SocketAddr,
    /// Address the discovery listener receives heartbeats on.
    pub discovery_bind: SocketAddr,
    /// Destination of every heartbeat, normally the limited broadcast address.
    pub broadcast_addr: SocketAddr,
    pub heartbeat_interval: Duration,
    /// Per-call bound for outbound peer-writes (connect + response).
    pub replication_timeout: Duration,
    /// HTTP port assumed for peers whose heartbeats do not announce one.
    pub peer_http_port: u16,
}

impl NodeConfig {
    pub fn new(secret: ClusterSecret) -> Self {
        Self {
            secret,
            http_bind: default_http_bind(),
            discovery_bind: default_discovery_bind(),
            broadcast_addr: default_broadcast_addr(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            replication_timeout: DEFAULT_REPLICATION_TIMEOUT,
            peer_http_port: DEFAULT_HTTP_PORT,
        }
    }
}

pub fn default_http_bind() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_HTTP_PORT)
}

pub fn default_discovery_bind() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_DISCOVERY_PORT)
}

pub fn default_broadcast_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DEFAULT_DISCOVERY_PORT)
}
