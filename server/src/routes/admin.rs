use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    app_state::SharedState,
    http_error::ApiResult,
    schema::ErrorResponse,
    session::AdminSession,
};

pub fn router() -> Router<SharedState> {
    Router::new().route("/reconcile", post(reconcile))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct ReconcileResponse {
    pub success: bool,
    pub synced: usize,
    pub failed: usize,
    pub orphans_removed: usize,
    pub pending_remote_ops: i64,
}

/// Drains queued media store operations and removes orphaned objects.
#[utoipa::path(
    post,
    path = "/api/admin/reconcile",
    responses(
        (status = 200, body = ReconcileResponse),
        (status = 401, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn reconcile(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
) -> ApiResult<Json<ReconcileResponse>> {
    let report = app_state.gallery.reconcile().await?;
    Ok(Json(ReconcileResponse {
        success: true,
        synced: report.synced,
        failed: report.failed,
        orphans_removed: report.orphans_removed,
        pending_remote_ops: report.pending_remote_ops,
    }))
}
