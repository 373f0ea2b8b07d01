use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared cluster credential.
///
/// Compared for plain equality on every heartbeat. The `Debug` form is redacted
/// so the secret never reaches a log line by accident.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClusterSecret(String);

impl ClusterSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClusterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClusterSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Identity of the local process.
///
/// Generated once at startup and never mutated. The `id` lets a node recognise
/// (and drop) its own broadcasts; the `secret` proves cluster eligibility.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub id: NodeId,
    pub secret: ClusterSecret,
    /// HTTP port announced to peers in every heartbeat.
    pub http_port: u16,
}

impl NodeIdentity {
    pub fn new(secret: ClusterSecret, http_port: u16) -> Self {
        Self {
            id: NodeId::new(),
            secret,
            http_port,
        }
    }

    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            id: self.id.clone(),
            secret: self.secret.clone(),
            http_port: Some(self.http_port),
        }
    }
}

/// The datagram every node broadcasts on each tick.
///
/// Field names on the wire stay compatible with nodes that predate `http_port`
/// (`guid` for the id, `string` for the secret).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Heartbeat {
    #[serde(rename = "guid")]
    pub id: NodeId,
    #[serde(rename = "string")]
    pub secret: ClusterSecret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
}

/// A peer admitted into the membership set.
///
/// `addr` is the source address the heartbeat arrived from and is the identity
/// of the entry in the registry. `http_addr` is where replicated writes go:
/// the same host, on the port the peer announced (or the cluster default).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub addr: SocketAddr,
    pub http_addr: SocketAddr,
}

impl PeerAddress {
    pub fn from_heartbeat(src: SocketAddr, heartbeat: &Heartbeat, default_http_port: u16) -> Self {
        let port = heartbeat.http_port.unwrap_or(default_http_port);
        Self {
            addr: src,
            http_addr: SocketAddr::new(src.ip(), port),
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (http {})", self.addr, self.http_addr)
    }
}
