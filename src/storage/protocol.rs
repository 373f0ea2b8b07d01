//! Storage HTTP Protocol
//!
//! Route patterns for the key-value endpoints and the helper that builds the
//! peer-write URL used by replication. Values travel as raw request bodies,
//! so there are no request DTOs here.

use reqwest::Url;
use std::net::SocketAddr;

// --- API Endpoints ---

/// Public endpoint for reading a key.
pub const ENDPOINT_READ: &str = "/read/:key/";
/// Public endpoint for client writes. Triggers replication.
pub const ENDPOINT_WRITE: &str = "/write/:key/";
/// Replication target. Stores the value without replicating it further.
pub const ENDPOINT_PEER_WRITE: &str = "/peer-write/:key/";

/// Path segment of [`ENDPOINT_PEER_WRITE`] without the key parameter.
const PEER_WRITE_SEGMENT: &str = "peer-write";

/// Builds `http://{http_addr}/peer-write/{key}/` with `key` percent-encoded.
pub fn peer_write_url(http_addr: SocketAddr, key: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(&format!("http://{}/", http_addr))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("cannot-be-a-base URL for {}", http_addr))?
        .clear()
        .push(PEER_WRITE_SEGMENT)
        .push(key)
        .push("");
    Ok(url)
}
