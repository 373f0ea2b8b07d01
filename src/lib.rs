//! Peer Key-Value Cluster Library
//!
//! This library crate defines the modules that make up one self-organizing
//! cluster node. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//!
//! - **`membership`**: UDP heartbeat discovery. Nodes broadcast a heartbeat carrying
//!   a shared secret; listeners admit matching senders into an append-only membership set.
//! - **`storage`**: The in-memory key-value store and the replication engine that
//!   pushes client writes to every known peer (one hop, best-effort).
//! - **`node`**: Runtime wiring. Binds sockets, builds the HTTP router and supervises
//!   the discovery and HTTP tasks with cooperative shutdown.
//! - **`config`**: Node settings and their defaults.

pub mod config;
pub mod membership;
pub mod node;
pub mod storage;
