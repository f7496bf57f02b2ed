use chrono::{DateTime, Utc};

use super::{CollectionId, PhotoId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Photo {
    pub id: PhotoId,
    pub title: String,
    pub description: Option<String>,
    /// Media store identifier of the blob, the locator key
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
}

/// A photo as listed, with the name of its collection joined in at read time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhotoEntry {
    pub photo: Photo,
    pub collection_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhotoFilter {
    pub collection_id: Option<CollectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePhoto {
    pub title: String,
    pub description: Option<String>,
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
}
