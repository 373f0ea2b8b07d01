use axum::body::Bytes;
use dashmap::DashMap;

/// Local in-memory key-value store.
///
/// Values are opaque byte payloads. Every `put` overwrites unconditionally,
/// whether it comes from a client write or a replicated peer-write; there is
/// no versioning, so the last write to arrive wins. Each key lives in a single
/// `DashMap` shard, and `put`/`get` on that key are serialised by the shard
/// lock, which keeps them linearizable with respect to each other.
#[derive(Debug, Default)]
pub struct KvStore {
    data: DashMap<String, Bytes>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: Bytes) {
        self.data.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
