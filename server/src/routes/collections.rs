use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use galleria_core::model;

use crate::{
    app_state::SharedState,
    http_error::{ApiJson, ApiResult},
    schema::{Collection, CollectionId, ErrorResponse},
    session::AdminSession,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_collections).post(create_collection))
        .route("/:id", put(rename_collection).delete(delete_collection))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct CollectionsResponse {
    pub success: bool,
    pub collections: Vec<Collection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct CollectionNameRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct CollectionResponse {
    pub success: bool,
    pub message: String,
    pub collection: Collection,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct DeleteCollectionResponse {
    pub success: bool,
    pub message: String,
    /// Photos that were in the collection and are now unassigned
    pub unassigned_count: usize,
}

#[utoipa::path(
    get,
    path = "/api/collections",
    responses((status = 200, body = CollectionsResponse)),
)]
#[tracing::instrument(skip(app_state))]
pub async fn get_collections(
    State(app_state): State<SharedState>,
) -> ApiResult<Json<CollectionsResponse>> {
    let collections = app_state
        .gallery
        .list_collections()
        .await?
        .into_iter()
        .map(Collection::from)
        .collect();
    Ok(Json(CollectionsResponse {
        success: true,
        collections,
    }))
}

#[utoipa::path(
    post,
    path = "/api/collections",
    request_body = CollectionNameRequest,
    responses(
        (status = 201, body = CollectionResponse),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse),
        (status = 409, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn create_collection(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<CollectionNameRequest>,
) -> ApiResult<(StatusCode, Json<CollectionResponse>)> {
    let collection = app_state.gallery.create_collection(&request.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(CollectionResponse {
            success: true,
            message: "Collection created successfully".to_owned(),
            collection: collection.into(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/collections/{id}",
    params(("id" = String, Path, description = "Collection id")),
    request_body = CollectionNameRequest,
    responses(
        (status = 200, body = CollectionResponse),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn rename_collection(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CollectionNameRequest>,
) -> ApiResult<Json<CollectionResponse>> {
    let id: model::CollectionId = CollectionId(id).try_into()?;
    let collection = app_state
        .gallery
        .rename_collection(id, &request.name)
        .await?;
    Ok(Json(CollectionResponse {
        success: true,
        message: "Collection updated successfully".to_owned(),
        collection: collection.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/collections/{id}",
    params(("id" = String, Path, description = "Collection id")),
    responses(
        (status = 200, body = DeleteCollectionResponse),
        (status = 401, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn delete_collection(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteCollectionResponse>> {
    let id: model::CollectionId = CollectionId(id).try_into()?;
    let unassigned_count = app_state.gallery.delete_collection(id).await?;
    Ok(Json(DeleteCollectionResponse {
        success: true,
        message: "Collection deleted successfully".to_owned(),
        unassigned_count,
    }))
}
