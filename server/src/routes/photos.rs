use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use galleria_core::{
    catalog::UploadFile,
    model::{self, PhotoFilter},
};

use crate::{
    app_state::SharedState,
    http_error::{ApiJson, ApiQuery, ApiResult},
    schema::{
        optional_collection_id, CollectionId, ErrorResponse, FailedUpload, IdValue,
        MessageResponse, Photo, PhotoId,
    },
    session::AdminSession,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_photos).post(upload_photos))
        .route("/bulk-update", put(bulk_update_photos))
        .route("/bulk-delete", delete(bulk_delete_photos))
        .route("/:id", delete(delete_photo))
        .route("/:id/collection", put(update_photo_collection))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PhotoQuery {
    /// Only photos in this collection
    pub collection_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct PhotosResponse {
    pub success: bool,
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub photos: Vec<Photo>,
    pub failed: Vec<FailedUpload>,
    pub uploaded_count: usize,
    pub failed_count: usize,
}

/// Multipart form of an upload. `titles` and `descriptions` are matched to
/// `files` by position.
#[allow(unused)]
#[derive(ToSchema)]
pub struct UploadForm {
    #[schema(value_type = Vec<String>)]
    files: Vec<Vec<u8>>,
    titles: Vec<String>,
    descriptions: Vec<String>,
    collection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct UpdatePhotoCollectionRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub collection_id: Option<IdValue>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct PhotoResponse {
    pub success: bool,
    pub message: String,
    pub photo: Photo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct BulkUpdateRequest {
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub photo_ids: Vec<IdValue>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub collection_id: Option<IdValue>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct BulkUpdateResponse {
    pub success: bool,
    pub message: String,
    pub updated_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub photo_ids: Vec<IdValue>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct BulkDeleteResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: usize,
}

fn parse_photo_ids(ids: &[IdValue]) -> ApiResult<Vec<model::PhotoId>> {
    Ok(ids
        .iter()
        .map(model::PhotoId::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

#[utoipa::path(
    get,
    path = "/api/photos",
    params(PhotoQuery),
    responses(
        (status = 200, body = PhotosResponse),
        (status = 400, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn get_photos(
    State(app_state): State<SharedState>,
    ApiQuery(query): ApiQuery<PhotoQuery>,
) -> ApiResult<Json<PhotosResponse>> {
    let collection_id = match query.collection_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(id) => Some(CollectionId(id.to_owned()).try_into()?),
    };
    let photos = app_state
        .gallery
        .list_photos(PhotoFilter { collection_id })
        .await?
        .into_iter()
        .map(Photo::from)
        .collect();
    Ok(Json(PhotosResponse {
        success: true,
        photos,
    }))
}

#[utoipa::path(
    post,
    path = "/api/photos",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, body = UploadResponse),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 500, body = UploadResponse),
    ),
)]
#[tracing::instrument(skip(app_state, multipart))]
pub async fn upload_photos(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let mut multipart = multipart?;
    let mut files: Vec<(String, axum::body::Bytes)> = Vec::new();
    let mut titles: Vec<String> = Vec::new();
    let mut descriptions: Vec<String> = Vec::new();
    let mut collection_id: Option<IdValue> = None;
    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "files" => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await?;
                files.push((filename, data));
            }
            "titles" => titles.push(field.text().await?),
            "descriptions" => descriptions.push(field.text().await?),
            "collection_id" => collection_id = Some(IdValue::Text(field.text().await?)),
            _ => {}
        }
    }
    let collection_id = optional_collection_id(collection_id.as_ref())?;
    let files: Vec<UploadFile> = files
        .into_iter()
        .enumerate()
        .map(|(i, (filename, data))| UploadFile {
            filename,
            data,
            title: titles.get(i).cloned(),
            description: descriptions.get(i).cloned(),
        })
        .collect();

    let report = app_state
        .gallery
        .upload_photos(files, collection_id)
        .await?;
    let uploaded_count = report.uploaded_count();
    let failed_count = report.failed_count();
    let any_uploaded = uploaded_count > 0;
    let response = UploadResponse {
        success: any_uploaded,
        message: format!("Successfully uploaded {} photos", uploaded_count),
        error: (!any_uploaded).then(|| format!("All {} uploads failed", failed_count)),
        photos: report.photos.into_iter().map(Photo::from).collect(),
        failed: report.failed.into_iter().map(FailedUpload::from).collect(),
        uploaded_count,
        failed_count,
    };
    let status = if any_uploaded {
        StatusCode::CREATED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(response)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/photos/{id}",
    params(("id" = String, Path, description = "Photo id")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 401, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn delete_photo(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id: model::PhotoId = PhotoId(id).try_into()?;
    app_state.gallery.delete_photo(id).await?;
    Ok(Json(MessageResponse::new("Photo deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/api/photos/{id}/collection",
    params(("id" = String, Path, description = "Photo id")),
    request_body = UpdatePhotoCollectionRequest,
    responses(
        (status = 200, body = PhotoResponse),
        (status = 401, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn update_photo_collection(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdatePhotoCollectionRequest>,
) -> ApiResult<Json<PhotoResponse>> {
    let id: model::PhotoId = PhotoId(id).try_into()?;
    let collection_id = optional_collection_id(request.collection_id.as_ref())?;
    let entry = app_state
        .gallery
        .set_photo_collection(id, collection_id)
        .await?;
    Ok(Json(PhotoResponse {
        success: true,
        message: "Photo collection updated successfully".to_owned(),
        photo: entry.into(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/photos/bulk-update",
    request_body = BulkUpdateRequest,
    responses(
        (status = 200, body = BulkUpdateResponse),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn bulk_update_photos(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<BulkUpdateRequest>,
) -> ApiResult<Json<BulkUpdateResponse>> {
    let ids = parse_photo_ids(&request.photo_ids)?;
    let collection_id = optional_collection_id(request.collection_id.as_ref())?;
    let updated_count = app_state
        .gallery
        .bulk_set_collection(ids, collection_id)
        .await?;
    Ok(Json(BulkUpdateResponse {
        success: true,
        message: format!("Successfully updated {} photos", updated_count),
        updated_count,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/photos/bulk-delete",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, body = BulkDeleteResponse),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse),
    ),
)]
#[tracing::instrument(skip(app_state))]
pub async fn bulk_delete_photos(
    State(app_state): State<SharedState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<BulkDeleteRequest>,
) -> ApiResult<Json<BulkDeleteResponse>> {
    let ids = parse_photo_ids(&request.photo_ids)?;
    let deleted_count = app_state.gallery.bulk_delete_photos(ids).await?;
    Ok(Json(BulkDeleteResponse {
        success: true,
        message: format!("Successfully deleted {} photos", deleted_count),
        deleted_count,
    }))
}
