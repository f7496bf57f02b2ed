use utoipa::OpenApi;

use crate::{routes, schema};

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health,
        routes::auth::login,
        routes::auth::logout,
        routes::auth::status,
        routes::photos::get_photos,
        routes::photos::upload_photos,
        routes::photos::delete_photo,
        routes::photos::update_photo_collection,
        routes::photos::bulk_update_photos,
        routes::photos::bulk_delete_photos,
        routes::collections::get_collections,
        routes::collections::create_collection,
        routes::collections::rename_collection,
        routes::collections::delete_collection,
        routes::admin::reconcile,
    ),
    components(schemas(
        schema::ErrorResponse,
        schema::MessageResponse,
        schema::Photo,
        schema::PhotoId,
        schema::Collection,
        schema::CollectionId,
        schema::FailedUpload,
        routes::HealthResponse,
        routes::auth::LoginRequest,
        routes::auth::AuthStatusResponse,
        routes::photos::PhotosResponse,
        routes::photos::UploadForm,
        routes::photos::UploadResponse,
        routes::photos::UpdatePhotoCollectionRequest,
        routes::photos::PhotoResponse,
        routes::photos::BulkUpdateRequest,
        routes::photos::BulkUpdateResponse,
        routes::photos::BulkDeleteRequest,
        routes::photos::BulkDeleteResponse,
        routes::collections::CollectionsResponse,
        routes::collections::CollectionNameRequest,
        routes::collections::CollectionResponse,
        routes::collections::DeleteCollectionResponse,
        routes::admin::ReconcileResponse,
    )),
    tags((name = "galleria"))
)]
pub struct ApiDoc;
