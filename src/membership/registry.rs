//! Membership Registry
//!
//! Append-only, insertion-ordered set of admitted peers. The discovery listener
//! is the only writer; HTTP handlers and the replicator read copies of it.

use super::types::PeerAddress;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MembershipRegistry {
    members: RwLock<Vec<PeerAddress>>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `peer` unless an entry with the same observed address exists.
    ///
    /// The check and the insert happen under one write lock, so concurrent
    /// heartbeats from the same sender can never produce two entries.
    /// Returns `true` if the peer was newly inserted.
    pub async fn insert_if_absent(&self, peer: PeerAddress) -> bool {
        let mut members = self.members.write().await;
        if members.iter().any(|existing| existing.addr == peer.addr) {
            return false;
        }
        members.push(peer);
        true
    }

    /// Returns a copy of the current membership in admission order.
    pub async fn snapshot(&self) -> Vec<PeerAddress> {
        self.members.read().await.clone()
    }

    pub async fn contains(&self, addr: &std::net::SocketAddr) -> bool {
        self.members
            .read()
            .await
            .iter()
            .any(|existing| &existing.addr == addr)
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }
}
