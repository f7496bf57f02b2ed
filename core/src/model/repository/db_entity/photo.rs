use diesel::{Queryable, Selectable};

use crate::model::{util::datetime_from_db_repr, CollectionId, Photo, PhotoId};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::Photo)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbPhoto {
    pub photo_id: i64,
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
    pub uploaded_at: i64,
    pub collection_id: Option<i64>,
}

impl TryFrom<DbPhoto> for Photo {
    type Error = eyre::Report;

    fn try_from(value: DbPhoto) -> Result<Self, Self::Error> {
        let uploaded_at = datetime_from_db_repr(value.uploaded_at)?;
        Ok(Photo {
            id: PhotoId(value.photo_id),
            title: value.title,
            description: value.description,
            public_id: value.public_id,
            url: value.url,
            secure_url: value.secure_url,
            original_filename: value.original_filename,
            file_format: value.file_format,
            file_size: value.file_size,
            width: value.width,
            height: value.height,
            uploaded_at,
            collection_id: value.collection_id.map(CollectionId),
        })
    }
}
