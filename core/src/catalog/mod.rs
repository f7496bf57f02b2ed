use std::sync::Arc;

use tracing::warn;

use crate::{
    error::{GalleryError, GalleryResult},
    media::MediaClient,
    model::repository::db::{DbConn, DbPool},
};

mod collections;
mod photos;
mod reconcile;

pub use photos::{sanitize_filename, FailedUpload, UploadFile, UploadReport};
pub use reconcile::{photo_metadata, ReconcileReport, SyncReport, ORPHAN_GRACE_MINUTES};

/// Collection registry, photo index and the reconciliation between the
/// database and the media store.
///
/// Mutations run in two phases. The local phase is one immediate SQLite
/// transaction that changes rows and queues the media store work it implies
/// in the `PendingRemoteOp` outbox. The remote phase drains the outbox.
/// A failure in the remote phase leaves the ops queued for the next drain.
/// Drains run one at a time.
#[derive(Debug, Clone)]
pub struct Gallery {
    pool: DbPool,
    media: MediaClient,
    folder: String,
    drain_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Gallery {
    pub fn new(pool: DbPool, media: MediaClient, folder: impl Into<String>) -> Self {
        Gallery {
            pool,
            media,
            folder: folder.into(),
            drain_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn media_store_name(&self) -> &'static str {
        self.media.name()
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Runs `f` inside an immediate transaction on a pooled connection.
    /// Any error rolls back every change `f` made.
    async fn in_transaction<T, F>(&self, f: F) -> GalleryResult<T>
    where
        F: FnOnce(&mut DbConn) -> GalleryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| conn.immediate_transaction(f))
            .await
            .map_err(|err| match err {
                deadpool_diesel::InteractError::Panic(_) => {
                    GalleryError::Persistence(eyre::eyre!("database interaction panicked"))
                }
                deadpool_diesel::InteractError::Aborted => {
                    GalleryError::Persistence(eyre::eyre!("database interaction was aborted"))
                }
            })?
    }

    /// Remote phase of a mutation. Failures stay in the outbox and are only logged,
    /// the local change is already committed.
    async fn drain_outbox(&self) {
        match self.sync_pending_remote_ops().await {
            Ok(report) if report.failed > 0 => {
                warn!(
                    failed = report.failed,
                    pending = report.pending,
                    "media store sync incomplete, ops stay queued"
                );
            }
            Ok(_) => {}
            Err(err) => warn!("error draining remote op outbox: {:#}", err),
        }
    }
}
