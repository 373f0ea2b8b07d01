//! Replication Engine
//!
//! Fans a locally accepted write out to every known peer's peer-write endpoint.
//! Replication is best-effort: each peer is attempted once, independently of
//! the others, and failures are logged and counted but never surface to the
//! client that issued the write.

use super::protocol::peer_write_url;
use crate::membership::types::PeerAddress;

use anyhow::Result;
use axum::body::Bytes;
use futures::future::join_all;
use std::time::Duration;

/// Outcome of one fan-out round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Replicator {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl Replicator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `key = value` to every peer in `peers` concurrently.
    pub async fn replicate(&self, peers: &[PeerAddress], key: &str, value: Bytes) -> ReplicationReport {
        let calls = peers
            .iter()
            .map(|peer| self.send_to_peer(peer, key, value.clone()));
        let results = join_all(calls).await;

        let mut report = ReplicationReport {
            attempted: peers.len(),
            ..Default::default()
        };

        for (peer, result) in peers.iter().zip(results) {
            match result {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Replication of '{}' to {} failed: {:#}", key, peer.http_addr, e);
                }
            }
        }

        report
    }

    async fn send_to_peer(&self, peer: &PeerAddress, key: &str, value: Bytes) -> Result<()> {
        let url = peer_write_url(peer.http_addr, key)?;
        tracing::debug!("Posting '{}' to '{}'", key, url);

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(value)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("peer-write returned {}", response.status()));
        }

        Ok(())
    }
}
