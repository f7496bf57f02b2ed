use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use galleria_core::{catalog, model};

use super::{CollectionId, PhotoId};

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct Photo {
    pub id: PhotoId,
    pub title: String,
    pub description: String,
    pub public_id: String,
    pub url: String,
    pub secure_url: String,
    pub original_filename: Option<String>,
    pub file_format: Option<String>,
    pub file_size: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub uploaded_at: DateTime<Utc>,
    pub collection_id: Option<CollectionId>,
    pub collection_name: Option<String>,
}

impl From<model::PhotoEntry> for Photo {
    fn from(entry: model::PhotoEntry) -> Self {
        let photo = entry.photo;
        Photo {
            id: photo.id.into(),
            title: photo.title,
            description: photo.description.unwrap_or_default(),
            public_id: photo.public_id,
            url: photo.url,
            secure_url: photo.secure_url,
            original_filename: photo.original_filename,
            file_format: photo.file_format,
            file_size: photo.file_size,
            width: photo.width,
            height: photo.height,
            uploaded_at: photo.uploaded_at,
            collection_id: photo.collection_id.map(Into::into),
            collection_name: entry.collection_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct FailedUpload {
    pub filename: String,
    pub error: String,
}

impl From<catalog::FailedUpload> for FailedUpload {
    fn from(value: catalog::FailedUpload) -> Self {
        FailedUpload {
            filename: value.filename,
            error: value.error,
        }
    }
}
