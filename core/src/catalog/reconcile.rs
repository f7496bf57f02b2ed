use std::collections::HashSet;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::GalleryResult,
    interact,
    media::{ListFilter, ObjectMetadata, RemoteOutcome},
    model::{
        repository, stable_collection_key, Collection, PendingRemoteOp, Photo, RemoteOpId,
        RemoteOpKind,
    },
};

use super::Gallery;

/// Uploads younger than this many minutes are never treated as orphans,
/// their row may still be on its way.
pub const ORPHAN_GRACE_MINUTES: i64 = 10;

const OUTBOX_BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Ops applied (or found to be moot) and removed from the outbox
    pub synced: usize,
    /// Ops that failed and stay queued
    pub failed: usize,
    /// Ops left in the outbox after the drain
    pub pending: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub synced: usize,
    pub failed: usize,
    pub orphans_removed: usize,
    pub pending_remote_ops: i64,
}

/// Metadata mirrored to the media store for a photo.
///
/// The collection keys are left out entirely for an unassigned photo.
pub fn photo_metadata(photo: &Photo, collection: Option<&Collection>) -> ObjectMetadata {
    metadata_for(&photo.title, photo.description.as_deref(), collection)
}

pub(super) fn metadata_for(
    title: &str,
    description: Option<&str>,
    collection: Option<&Collection>,
) -> ObjectMetadata {
    let mut metadata = ObjectMetadata::new();
    metadata.insert("title".to_owned(), title.to_owned());
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        metadata.insert("description".to_owned(), description.to_owned());
    }
    if let Some(collection) = collection {
        metadata.insert(
            "collection".to_owned(),
            stable_collection_key(&collection.name),
        );
        metadata.insert("collection_id".to_owned(), collection.id.0.to_string());
    }
    metadata
}

enum OpResult {
    Completed,
    Failed(String),
}

impl Gallery {
    #[instrument(skip(self))]
    pub async fn pending_remote_ops(&self) -> GalleryResult<i64> {
        let conn = self.pool.get().await?;
        let count = interact!(conn, move |conn| {
            repository::remote_op::count_pending_remote_ops(conn)
        })
        .await??;
        Ok(count)
    }

    /// Applies every queued op to the media store. An op leaves the outbox once
    /// the store confirmed it or reported the object missing, otherwise its
    /// failure is recorded and it stays for the next drain.
    ///
    /// An op queued again while it was being applied keeps its place in the
    /// outbox. The drain waiting behind this one applies it with fresh data.
    #[instrument(skip(self))]
    pub async fn sync_pending_remote_ops(&self) -> GalleryResult<SyncReport> {
        let _drain = self.drain_lock.lock().await;
        let mut report = SyncReport::default();
        let mut after: Option<RemoteOpId> = None;
        loop {
            let conn = self.pool.get().await?;
            let batch = interact!(conn, move |conn| {
                repository::remote_op::get_pending_remote_ops(conn, after, OUTBOX_BATCH_SIZE)
            })
            .await??;
            drop(conn);
            let Some(last) = batch.last() else {
                break;
            };
            after = Some(last.id);
            for op in batch {
                let op_id = op.id;
                let generation = op.generation;
                let result = self.apply_remote_op(&op).await?;
                let conn = self.pool.get().await?;
                match result {
                    OpResult::Completed => {
                        let completed = interact!(conn, move |conn| {
                            repository::remote_op::complete_remote_op(conn, op_id, generation)
                        })
                        .await??;
                        if completed {
                            report.synced += 1;
                        } else {
                            debug!(
                                %op_id,
                                generation,
                                public_id = %op.public_id,
                                "op queued again while applied, kept"
                            );
                        }
                    }
                    OpResult::Failed(error) => {
                        warn!(%op_id, kind = ?op.kind, public_id = %op.public_id, %error, "remote op failed");
                        interact!(conn, move |conn| {
                            repository::remote_op::record_remote_op_failure(conn, op_id, &error)
                        })
                        .await??;
                        report.failed += 1;
                    }
                }
            }
        }
        report.pending = self.pending_remote_ops().await?;
        if report.synced > 0 || report.failed > 0 {
            debug!(?report, "drained remote op outbox");
        }
        Ok(report)
    }

    async fn apply_remote_op(&self, op: &PendingRemoteOp) -> GalleryResult<OpResult> {
        let outcome = match op.kind {
            RemoteOpKind::SyncMetadata => {
                let public_id = op.public_id.clone();
                let conn = self.pool.get().await?;
                let row = interact!(conn, move |conn| {
                    let Some(photo) = repository::photo::get_photo_by_public_id(conn, &public_id)?
                    else {
                        return Ok(None);
                    };
                    let collection = match photo.collection_id {
                        Some(id) => repository::collection::get_collection(conn, id)?,
                        None => None,
                    };
                    Ok(Some((photo, collection)))
                })
                .await??;
                let Some((photo, collection)) = row else {
                    // row deleted since the op was queued, nothing left to mirror
                    return Ok(OpResult::Completed);
                };
                let metadata = photo_metadata(&photo, collection.as_ref());
                self.media.update_metadata(&op.public_id, &metadata).await
            }
            RemoteOpKind::DestroyBlob => self.media.delete(&op.public_id).await,
        };
        Ok(match outcome {
            Ok(RemoteOutcome::Done) => OpResult::Completed,
            Ok(RemoteOutcome::NotFound) => {
                debug!(public_id = %op.public_id, kind = ?op.kind, "object already gone");
                OpResult::Completed
            }
            Err(err) => OpResult::Failed(err.to_string()),
        })
    }

    /// Destroys objects in the gallery folder that no photo row refers to,
    /// that are not already queued for destruction and that are older than
    /// `grace`. Returns the number of objects removed.
    #[instrument(skip(self))]
    pub async fn sweep_orphaned_blobs(&self, grace: Duration) -> GalleryResult<usize> {
        let objects = self
            .media
            .list(&ListFilter {
                folder: self.folder.clone(),
            })
            .await?;
        let conn = self.pool.get().await?;
        let known: HashSet<String> = interact!(conn, move |conn| {
            let mut known: HashSet<String> =
                repository::photo::get_all_public_ids(conn)?.into_iter().collect();
            known.extend(repository::remote_op::get_pending_public_ids(
                conn,
                RemoteOpKind::DestroyBlob,
            )?);
            Ok(known)
        })
        .await??;
        let cutoff = Utc::now() - grace;
        let mut removed = 0;
        for object in objects {
            if known.contains(&object.public_id) || object.created_at > cutoff {
                continue;
            }
            match self.media.delete(&object.public_id).await {
                Ok(RemoteOutcome::Done) => {
                    info!(public_id = %object.public_id, "removed orphaned blob");
                    removed += 1;
                }
                Ok(RemoteOutcome::NotFound) => {
                    debug!(public_id = %object.public_id, "orphaned blob already gone");
                }
                Err(err) => warn!(
                    public_id = %object.public_id,
                    "could not remove orphaned blob: {}",
                    err
                ),
            }
        }
        Ok(removed)
    }

    /// Drains the outbox, then sweeps orphans.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> GalleryResult<ReconcileReport> {
        let sync = self.sync_pending_remote_ops().await?;
        let orphans_removed = self
            .sweep_orphaned_blobs(Duration::minutes(ORPHAN_GRACE_MINUTES))
            .await?;
        let report = ReconcileReport {
            synced: sync.synced,
            failed: sync.failed,
            orphans_removed,
            pending_remote_ops: self.pending_remote_ops().await?,
        };
        info!(?report, "reconciled gallery with media store");
        Ok(report)
    }
}
