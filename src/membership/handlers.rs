use axum::{Json, extract::Extension, http::StatusCode};
use std::sync::Arc;

use super::types::PeerAddress;
use crate::node::ClusterContext;

/// Status endpoint: the current membership set, in admission order.
pub async fn handle_status(
    Extension(ctx): Extension<Arc<ClusterContext>>,
) -> (StatusCode, Json<Vec<PeerAddress>>) {
    let members = ctx.members.snapshot().await;
    tracing::debug!("Status requested: {} known peers", members.len());

    (StatusCode::OK, Json(members))
}
