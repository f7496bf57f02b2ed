use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::CollectionId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A collection together with the number of photos currently referencing it.
/// The count is computed when the row is read and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionWithCount {
    pub collection: Collection,
    pub photo_count: i64,
}

/// Case-folded form of a collection name, the unit of uniqueness.
pub fn collection_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Fixed-width key derived only from the case-folded name.
///
/// Written into media store metadata so that a registry rebuilt from a
/// media store listing maps photos back to the same collection.
pub fn stable_collection_key(name: &str) -> String {
    let digest = Sha256::digest(collection_name_key(name).as_bytes());
    hex::encode(&digest[..8])
}
