use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use tracing::instrument;

use crate::config::{MediaBackendConfig, MediaStoreConfig};

use self::retry::{retry_with_backoff, RetryAction, RetryConfig};

pub mod cloudinary;
pub mod local;
pub mod retry;

/// Free-form key-value metadata attached to a stored object.
pub type ObjectMetadata = BTreeMap<String, String>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Network failure, timeout, rate limiting or a server side error.
    /// Worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),
    /// The store refused the request. Retrying will not help.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl MediaError {
    pub fn retry_action(&self) -> RetryAction {
        match self {
            MediaError::Transient(_) => RetryAction::Retry,
            MediaError::Rejected(_) => RetryAction::Abort,
        }
    }
}

/// Result of an operation addressing an existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Done,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub filename: String,
    /// Folder the object is stored in, becomes the prefix of its public_id
    pub folder: String,
    pub metadata: ObjectMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub public_id: String,
    pub url: String,
    pub secure_url: String,
    pub format: Option<String>,
    pub bytes: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub metadata: ObjectMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub folder: String,
}

#[async_trait]
pub trait MediaStoreProvider: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn upload(&self, request: &UploadRequest) -> Result<StoredObject, MediaError>;

    async fn delete(&self, public_id: &str) -> Result<RemoteOutcome, MediaError>;

    /// All objects in `filter.folder`, following pagination to the end.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<StoredObject>, MediaError>;

    /// Replaces the metadata of the object with `metadata`.
    async fn update_metadata(
        &self,
        public_id: &str,
        metadata: &ObjectMetadata,
    ) -> Result<RemoteOutcome, MediaError>;
}

/// The one media store client shared by all request handlers.
///
/// Every call goes through [`retry_with_backoff`], so transient failures are
/// retried here and nowhere else.
#[derive(Clone)]
pub struct MediaClient {
    provider: Arc<dyn MediaStoreProvider>,
    retry: RetryConfig,
}

impl std::fmt::Debug for MediaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaClient")
            .field("provider", &self.provider.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl MediaClient {
    pub fn new(provider: Arc<dyn MediaStoreProvider>, retry: RetryConfig) -> Self {
        MediaClient { provider, retry }
    }

    pub fn from_config(config: &MediaStoreConfig, retry: RetryConfig) -> Result<Self> {
        let provider: Arc<dyn MediaStoreProvider> = match &config.backend {
            MediaBackendConfig::Cloudinary(credentials) => Arc::new(
                cloudinary::CloudinaryStore::new(credentials.clone(), config.timeout)
                    .wrap_err("error creating Cloudinary client")?,
            ),
            MediaBackendConfig::Local { root, public_url } => Arc::new(
                local::LocalMediaStore::new(root.clone(), public_url.clone()),
            ),
        };
        Ok(MediaClient::new(provider, retry))
    }

    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    #[instrument(skip(self, request), fields(filename = %request.filename, store = self.name()))]
    pub async fn upload(&self, request: &UploadRequest) -> Result<StoredObject, MediaError> {
        retry_with_backoff(&self.retry, MediaError::retry_action, || {
            self.provider.upload(request)
        })
        .await
    }

    #[instrument(skip(self), fields(store = self.name()))]
    pub async fn delete(&self, public_id: &str) -> Result<RemoteOutcome, MediaError> {
        retry_with_backoff(&self.retry, MediaError::retry_action, || {
            self.provider.delete(public_id)
        })
        .await
    }

    #[instrument(skip(self), fields(store = self.name()))]
    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<StoredObject>, MediaError> {
        retry_with_backoff(&self.retry, MediaError::retry_action, || {
            self.provider.list(filter)
        })
        .await
    }

    #[instrument(skip(self, metadata), fields(store = self.name()))]
    pub async fn update_metadata(
        &self,
        public_id: &str,
        metadata: &ObjectMetadata,
    ) -> Result<RemoteOutcome, MediaError> {
        retry_with_backoff(&self.retry, MediaError::retry_action, || {
            self.provider.update_metadata(public_id, metadata)
        })
        .await
    }
}

/// Lowercased extension of `filename`, if it has one.
pub(crate) fn format_from_filename(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
pub(crate) mod testing;
