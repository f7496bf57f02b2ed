use chrono::{DateTime, SubsecRound, Utc};

use crate::model::{CollectionId, CreatePhoto};

use super::db;


pub fn utc_now_millis_zero() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now().trunc_subsecs(3)
}

pub fn create_photo(
    public_id: &str,
    uploaded_at: DateTime<Utc>,
    collection_id: Option<CollectionId>,
) -> CreatePhoto {
    CreatePhoto {
        title: format!("title of {}", public_id),
        description: None,
        public_id: public_id.to_owned(),
        url: format!("http://media.test/{}.jpg", public_id),
        secure_url: format!("https://media.test/{}.jpg", public_id),
        original_filename: Some(format!("{}.jpg", public_id)),
        file_format: Some("jpg".to_owned()),
        file_size: Some(1024),
        width: Some(640),
        height: Some(480),
        uploaded_at,
        collection_id,
    }
}
