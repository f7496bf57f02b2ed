use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{app_state::SharedState, http_error::ApiResult};

pub mod admin;
pub mod auth;
pub mod collections;
pub mod photos;

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .nest("/photos", photos::router())
        .nest("/collections", collections::router())
        .nest("/admin", admin::router())
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub media_store: String,
    /// Media store operations waiting to be applied
    pub pending_remote_ops: i64,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, body = HealthResponse)),
)]
#[tracing::instrument(skip(app_state))]
pub async fn health(State(app_state): State<SharedState>) -> ApiResult<Json<HealthResponse>> {
    let pending_remote_ops = app_state.gallery.pending_remote_ops().await?;
    Ok(Json(HealthResponse {
        success: true,
        status: "healthy".to_owned(),
        timestamp: Utc::now(),
        media_store: app_state.gallery.media_store_name().to_owned(),
        pending_remote_ops,
    }))
}
