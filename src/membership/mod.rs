//! Membership & Discovery Module
//!
//! Nodes find each other by broadcasting a small heartbeat over UDP. Any node
//! that hears a heartbeat carrying the shared cluster secret (and that is not
//! its own) admits the sender into its membership set.
//!
//! ## Core Mechanisms
//! - **Heartbeat**: A JSON datagram `{guid, string, http_port}` sent to the broadcast address every tick.
//! - **Admission**: Secret equality, self-exclusion by node id, and duplicate suppression by source address.
//! - **Registry**: Append-only and insertion-ordered. Peers are never removed.

pub mod codec;
pub mod handlers;
pub mod registry;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;
