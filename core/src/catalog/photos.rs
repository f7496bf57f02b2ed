use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::{
    error::{GalleryError, GalleryResult},
    interact,
    media::{RemoteOutcome, StoredObject, UploadRequest},
    model::{
        repository, Collection, CollectionId, CreatePhoto, PhotoEntry, PhotoFilter, PhotoId,
        RemoteOpKind,
    },
};

use super::{reconcile::metadata_for, Gallery};

/// One file of a multi-file upload with its optional per-file fields.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub data: Bytes,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub photos: Vec<PhotoEntry>,
    pub failed: Vec<FailedUpload>,
}

impl UploadReport {
    pub fn uploaded_count(&self) -> usize {
        self.photos.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Reduces a client supplied filename to a safe title: the last path
/// component with whitespace turned into `_` and everything outside
/// `[A-Za-z0-9._-]` dropped.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "photo".to_owned()
    } else {
        cleaned.to_owned()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn validate_ids(ids: &[PhotoId]) -> GalleryResult<()> {
    if ids.is_empty() {
        return Err(GalleryError::validation("No photo IDs provided"));
    }
    Ok(())
}

impl Gallery {
    /// Photos matching `filter`, most recently uploaded first.
    #[instrument(skip(self))]
    pub async fn list_photos(&self, filter: PhotoFilter) -> GalleryResult<Vec<PhotoEntry>> {
        let conn = self.pool.get().await?;
        let photos = interact!(conn, move |conn| {
            repository::photo::get_photos(conn, &filter)
        })
        .await??;
        Ok(photos)
    }

    #[instrument(skip(self))]
    pub async fn get_photo(&self, id: PhotoId) -> GalleryResult<PhotoEntry> {
        let conn = self.pool.get().await?;
        let photo = interact!(conn, move |conn| {
            repository::photo::get_photo_entry(conn, id)
        })
        .await??;
        photo.ok_or(GalleryError::NotFound("Photo"))
    }

    /// Stores every file independently: remote upload first, then the row.
    /// A failing file is reported in the result and does not stop the others.
    #[instrument(skip(self, files), fields(file_count = files.len()))]
    pub async fn upload_photos(
        &self,
        files: Vec<UploadFile>,
        collection_id: Option<CollectionId>,
    ) -> GalleryResult<UploadReport> {
        if files.is_empty() {
            return Err(GalleryError::validation("No files provided"));
        }
        if files.iter().all(|file| file.filename.is_empty()) {
            return Err(GalleryError::validation("No files selected"));
        }
        let collection: Option<Collection> = match collection_id {
            Some(collection_id) => Some(self.get_collection(collection_id).await?.collection),
            None => None,
        };

        let mut report = UploadReport::default();
        for file in files {
            if file.filename.is_empty() {
                continue;
            }
            let filename = file.filename.clone();
            match self.upload_one(file, collection.as_ref()).await {
                Ok(entry) => report.photos.push(entry),
                Err(err) => {
                    error!(%filename, "error uploading file: {:#}", err);
                    report.failed.push(FailedUpload {
                        filename,
                        error: err.to_string(),
                    });
                }
            }
        }
        info!(
            uploaded = report.uploaded_count(),
            failed = report.failed_count(),
            "upload finished"
        );
        Ok(report)
    }

    async fn upload_one(
        &self,
        file: UploadFile,
        collection: Option<&Collection>,
    ) -> GalleryResult<PhotoEntry> {
        let title = non_empty(file.title).unwrap_or_else(|| sanitize_filename(&file.filename));
        let description = non_empty(file.description);
        let request = UploadRequest {
            metadata: metadata_for(&title, description.as_deref(), collection),
            data: file.data,
            filename: file.filename.clone(),
            folder: self.folder.clone(),
        };
        let stored: StoredObject = self.media.upload(&request).await?;
        let public_id = stored.public_id.clone();
        let create = CreatePhoto {
            title,
            description,
            public_id: stored.public_id,
            url: stored.url,
            secure_url: stored.secure_url,
            original_filename: Some(file.filename),
            file_format: stored.format,
            file_size: stored.bytes,
            width: stored.width,
            height: stored.height,
            uploaded_at: Utc::now(),
            collection_id: collection.map(|c| c.id),
        };
        let inserted = self
            .in_transaction(move |conn| {
                let id = repository::photo::insert_photo(conn, &create)?;
                repository::photo::get_photo_entry(conn, id)?
                    .ok_or(GalleryError::NotFound("Photo"))
            })
            .await;
        match inserted {
            Ok(entry) => Ok(entry),
            Err(err) => {
                // the blob has no row, remove it so it does not become an orphan
                match self.media.delete(&public_id).await {
                    Ok(RemoteOutcome::Done | RemoteOutcome::NotFound) => {}
                    Err(delete_err) => warn!(
                        %public_id,
                        "could not remove blob of failed upload, it is left as an orphan: {}",
                        delete_err
                    ),
                }
                Err(err)
            }
        }
    }

    /// Sets or, with `None`, clears the collection of one photo.
    #[instrument(skip(self))]
    pub async fn set_photo_collection(
        &self,
        id: PhotoId,
        collection_id: Option<CollectionId>,
    ) -> GalleryResult<PhotoEntry> {
        let entry = self
            .in_transaction(move |conn| {
                if repository::photo::get_photo(conn, id)?.is_none() {
                    return Err(GalleryError::NotFound("Photo"));
                }
                if let Some(collection_id) = collection_id {
                    if repository::collection::get_collection(conn, collection_id)?.is_none() {
                        return Err(GalleryError::NotFound("Collection"));
                    }
                }
                let public_ids =
                    repository::photo::set_collection_for_photos(conn, &[id], collection_id)?;
                repository::remote_op::enqueue_remote_ops(
                    conn,
                    RemoteOpKind::SyncMetadata,
                    &public_ids,
                )?;
                repository::photo::get_photo_entry(conn, id)?.ok_or(GalleryError::NotFound("Photo"))
            })
            .await?;
        self.drain_outbox().await;
        Ok(entry)
    }

    /// Returns the number of photos that exist among `ids` and were updated.
    #[instrument(skip(self, ids), fields(id_count = ids.len()))]
    pub async fn bulk_set_collection(
        &self,
        ids: Vec<PhotoId>,
        collection_id: Option<CollectionId>,
    ) -> GalleryResult<usize> {
        validate_ids(&ids)?;
        let updated = self
            .in_transaction(move |conn| {
                if let Some(collection_id) = collection_id {
                    if repository::collection::get_collection(conn, collection_id)?.is_none() {
                        return Err(GalleryError::NotFound("Collection"));
                    }
                }
                let public_ids =
                    repository::photo::set_collection_for_photos(conn, &ids, collection_id)?;
                repository::remote_op::enqueue_remote_ops(
                    conn,
                    RemoteOpKind::SyncMetadata,
                    &public_ids,
                )?;
                Ok(public_ids.len())
            })
            .await?;
        info!(updated, "bulk updated photo collection");
        self.drain_outbox().await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_photo(&self, id: PhotoId) -> GalleryResult<()> {
        self.in_transaction(move |conn| {
            let public_ids = repository::photo::delete_photos(conn, &[id])?;
            if public_ids.is_empty() {
                return Err(GalleryError::NotFound("Photo"));
            }
            repository::remote_op::enqueue_remote_ops(conn, RemoteOpKind::DestroyBlob, &public_ids)?;
            Ok(())
        })
        .await?;
        info!(%id, "deleted photo");
        self.drain_outbox().await;
        Ok(())
    }

    /// Returns the number of photo rows removed.
    #[instrument(skip(self, ids), fields(id_count = ids.len()))]
    pub async fn bulk_delete_photos(&self, ids: Vec<PhotoId>) -> GalleryResult<usize> {
        validate_ids(&ids)?;
        let deleted = self
            .in_transaction(move |conn| {
                let public_ids = repository::photo::delete_photos(conn, &ids)?;
                repository::remote_op::enqueue_remote_ops(
                    conn,
                    RemoteOpKind::DestroyBlob,
                    &public_ids,
                )?;
                Ok(public_ids.len())
            })
            .await?;
        info!(deleted, "bulk deleted photos");
        self.drain_outbox().await;
        Ok(deleted)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sanitize_filename_keeps_a_safe_basename() {
        assert_eq!(sanitize_filename("My Beach Day.jpg"), "My_Beach_Day.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\IMG 01.PNG"), "IMG_01.PNG");
        assert_eq!(sanitize_filename("été.png"), "t.png");
        assert_eq!(sanitize_filename("..."), "photo");
    }
}
