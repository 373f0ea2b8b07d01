//! Replicated Storage Module
//!
//! An in-memory key-value store whose client writes are pushed to every known
//! peer.
//!
//! ## Core Concepts
//! - **Local store**: `KvStore`, a concurrent map with last-write-wins overwrites.
//! - **Replication**: A client write fans out once to all members via `/peer-write`. No retries, no acks.
//! - **One hop**: A peer-write is stored but never forwarded, so writes cannot cascade around the cluster.

pub mod handlers;
pub mod memory;
pub mod protocol;
pub mod replication;
