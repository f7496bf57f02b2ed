use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{info, instrument};

use crate::{
    error::{GalleryError, GalleryResult},
    interact,
    model::{repository, CollectionId, CollectionWithCount, RemoteOpKind},
};

use super::Gallery;

pub const MAX_COLLECTION_NAME_LEN: usize = 100;

fn validate_name(name: &str) -> GalleryResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GalleryError::validation("Collection name is required"));
    }
    if name.chars().count() > MAX_COLLECTION_NAME_LEN {
        return Err(GalleryError::validation(format!(
            "Collection name can not be longer than {} characters",
            MAX_COLLECTION_NAME_LEN
        )));
    }
    Ok(name.to_owned())
}

/// The unique index on the case-folded name catches what the scan missed.
fn map_unique_violation(err: eyre::Report, name: &str) -> GalleryError {
    match err.downcast_ref::<DieselError>() {
        Some(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            GalleryError::DuplicateName(name.to_owned())
        }
        _ => GalleryError::Persistence(err),
    }
}

impl Gallery {
    /// All collections, newest first, with fresh photo counts.
    #[instrument(skip(self))]
    pub async fn list_collections(&self) -> GalleryResult<Vec<CollectionWithCount>> {
        let conn = self.pool.get().await?;
        let collections = interact!(conn, move |conn| {
            repository::collection::get_collections_with_photo_count(conn)
        })
        .await??;
        Ok(collections)
    }

    #[instrument(skip(self))]
    pub async fn get_collection(&self, id: CollectionId) -> GalleryResult<CollectionWithCount> {
        let conn = self.pool.get().await?;
        let collection = interact!(conn, move |conn| {
            repository::collection::get_collection_with_photo_count(conn, id)
        })
        .await??;
        collection.ok_or(GalleryError::NotFound("Collection"))
    }

    /// Number of photos currently in the collection. Never cached.
    #[instrument(skip(self))]
    pub async fn count_photos_in_collection(&self, id: CollectionId) -> GalleryResult<i64> {
        Ok(self.get_collection(id).await?.photo_count)
    }

    #[instrument(skip(self))]
    pub async fn create_collection(&self, name: &str) -> GalleryResult<CollectionWithCount> {
        let name = validate_name(name)?;
        let collection = self
            .in_transaction(move |conn| {
                if repository::collection::find_collection_with_name(conn, &name, None)?.is_some() {
                    return Err(GalleryError::DuplicateName(name));
                }
                let id = repository::collection::insert_collection(conn, &name, Utc::now())
                    .map_err(|err| map_unique_violation(err, &name))?;
                repository::collection::get_collection_with_photo_count(conn, id)?
                    .ok_or(GalleryError::NotFound("Collection"))
            })
            .await?;
        info!(id = %collection.collection.id, name = %collection.collection.name, "created collection");
        Ok(collection)
    }

    /// Renames the collection. Photos reference collections by id only, but the
    /// media store mirror carries the name-derived collection key, so every
    /// photo in the collection gets its metadata rewritten.
    #[instrument(skip(self))]
    pub async fn rename_collection(
        &self,
        id: CollectionId,
        name: &str,
    ) -> GalleryResult<CollectionWithCount> {
        let name = validate_name(name)?;
        let collection = self
            .in_transaction(move |conn| {
                if repository::collection::get_collection(conn, id)?.is_none() {
                    return Err(GalleryError::NotFound("Collection"));
                }
                if repository::collection::find_collection_with_name(conn, &name, Some(id))?
                    .is_some()
                {
                    return Err(GalleryError::DuplicateName(name));
                }
                repository::collection::rename_collection(conn, id, &name)
                    .map_err(|err| map_unique_violation(err, &name))?;
                let public_ids = repository::photo::get_public_ids_in_collection(conn, id)?;
                repository::remote_op::enqueue_remote_ops(
                    conn,
                    RemoteOpKind::SyncMetadata,
                    &public_ids,
                )?;
                repository::collection::get_collection_with_photo_count(conn, id)?
                    .ok_or(GalleryError::NotFound("Collection"))
            })
            .await?;
        info!(%id, name = %collection.collection.name, "renamed collection");
        self.drain_outbox().await;
        Ok(collection)
    }

    /// Unassigns every photo in the collection, then removes it, in one
    /// transaction. Returns the number of photos that were unassigned.
    #[instrument(skip(self))]
    pub async fn delete_collection(&self, id: CollectionId) -> GalleryResult<usize> {
        let unassigned = self
            .in_transaction(move |conn| {
                if repository::collection::get_collection(conn, id)?.is_none() {
                    return Err(GalleryError::NotFound("Collection"));
                }
                let public_ids = repository::photo::unassign_collection(conn, id)?;
                repository::remote_op::enqueue_remote_ops(
                    conn,
                    RemoteOpKind::SyncMetadata,
                    &public_ids,
                )?;
                repository::collection::delete_collection(conn, id)?;
                Ok(public_ids.len())
            })
            .await?;
        info!(%id, unassigned, "deleted collection");
        self.drain_outbox().await;
        Ok(unassigned)
    }
}

#[cfg(test)]
mod test {
    use claims::{assert_matches, assert_ok_eq};

    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_ok_eq!(validate_name("  Vacation "), "Vacation".to_owned());
        assert_matches!(validate_name("   "), Err(GalleryError::Validation(_)));
        let long = "x".repeat(MAX_COLLECTION_NAME_LEN + 1);
        assert_matches!(validate_name(&long), Err(GalleryError::Validation(_)));
    }
}
