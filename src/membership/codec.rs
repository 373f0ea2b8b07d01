//! Heartbeat wire codec.
//!
//! Heartbeats travel as small JSON documents in a single UDP datagram. Anything
//! that does not decode is someone else's traffic and is simply dropped by the
//! listener, so decoding never panics and never aborts the receive loop.

use super::types::Heartbeat;
use thiserror::Error;

/// Upper bound for an encoded heartbeat, and the listener's receive buffer size.
pub const MAX_HEARTBEAT_SIZE: usize = 256;

#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("heartbeat is {size} bytes, limit is {MAX_HEARTBEAT_SIZE}")]
    TooLarge { size: usize },

    #[error("malformed heartbeat: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn encode(heartbeat: &Heartbeat) -> Result<Vec<u8>, HeartbeatError> {
    let bytes = serde_json::to_vec(heartbeat)?;
    if bytes.len() > MAX_HEARTBEAT_SIZE {
        return Err(HeartbeatError::TooLarge { size: bytes.len() });
    }
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<Heartbeat, HeartbeatError> {
    if bytes.len() > MAX_HEARTBEAT_SIZE {
        return Err(HeartbeatError::TooLarge { size: bytes.len() });
    }
    Ok(serde_json::from_slice(bytes)?)
}
