use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use galleria_core::model;

use super::CollectionId;

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Photos currently in the collection, counted when the response is built
    pub photo_count: i64,
}

impl From<model::CollectionWithCount> for Collection {
    fn from(value: model::CollectionWithCount) -> Self {
        Collection {
            id: value.collection.id.into(),
            name: value.collection.name,
            created_at: value.collection.created_at,
            photo_count: value.photo_count,
        }
    }
}
