use axum::{
    body::Bytes,
    extract::{Extension, Path, rejection::BytesRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::node::ClusterContext;

pub async fn handle_read(
    Extension(ctx): Extension<Arc<ClusterContext>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let value = ctx.store.get(&key).unwrap_or_default();
    tracing::debug!("Read key '{}' ({} bytes)", key, value.len());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        value,
    )
}

/// Client write: store locally, then replicate to every known peer.
///
/// The local put happens first and the response is always 201 once it has,
/// whatever the peers did.
pub async fn handle_write(
    Extension(ctx): Extension<Arc<ClusterContext>>,
    Path(key): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let value = match body {
        Ok(value) => value,
        Err(rejection) => {
            tracing::warn!("Failed to read write body for key '{}': {}", key, rejection);
            return rejection.into_response();
        }
    };

    ctx.store.put(key.clone(), value.clone());
    tracing::info!("Wrote {} bytes for key '{}'", value.len(), key);

    let peers = ctx.members.snapshot().await;
    if !peers.is_empty() {
        let report = ctx.replicator.replicate(&peers, &key, value).await;
        tracing::info!(
            "Replicated key '{}' to {}/{} peers",
            key,
            report.succeeded,
            report.attempted
        );
    }

    StatusCode::CREATED.into_response()
}

/// Replication target. Never fans out again, so a write travels one hop.
pub async fn handle_peer_write(
    Extension(ctx): Extension<Arc<ClusterContext>>,
    Path(key): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let value = match body {
        Ok(value) => value,
        Err(rejection) => {
            tracing::warn!("Failed to read peer-write body for key '{}': {}", key, rejection);
            return rejection.into_response();
        }
    };

    tracing::debug!("Stored replica of key '{}' ({} bytes)", key, value.len());
    ctx.store.put(key, value);

    StatusCode::CREATED.into_response()
}
