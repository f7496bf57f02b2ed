use async_trait::async_trait;
use camino::Utf8PathBuf as PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    format_from_filename, ListFilter, MediaError, MediaStoreProvider, ObjectMetadata,
    RemoteOutcome, StoredObject, UploadRequest,
};

const DEFAULT_FORMAT: &str = "bin";

/// Filesystem media store.
///
/// Object `<folder>/<id>` is stored as `<root>/<folder>/<id>.<format>` with its
/// metadata in the sidecar `<root>/<folder>/<id>.json`.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sidecar {
    format: String,
    bytes: i64,
    created_at: DateTime<Utc>,
    metadata: ObjectMetadata,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        LocalMediaStore { root, public_url }
    }

    pub fn root(&self) -> &camino::Utf8Path {
        &self.root
    }

    fn sidecar_path(&self, public_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", public_id))
    }

    fn blob_path(&self, public_id: &str, format: &str) -> PathBuf {
        self.root.join(format!("{}.{}", public_id, format))
    }

    fn stored_object(&self, public_id: String, sidecar: Sidecar) -> StoredObject {
        let url = format!("{}/{}.{}", self.public_url, public_id, sidecar.format);
        StoredObject {
            public_id,
            secure_url: url.clone(),
            url,
            format: Some(sidecar.format),
            bytes: Some(sidecar.bytes),
            width: None,
            height: None,
            created_at: sidecar.created_at,
            metadata: sidecar.metadata,
        }
    }

    async fn read_sidecar(&self, public_id: &str) -> Result<Option<Sidecar>, MediaError> {
        let path = self.sidecar_path(public_id);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path, err)),
        };
        let sidecar = serde_json::from_slice(&contents)
            .map_err(|err| MediaError::Rejected(format!("corrupt sidecar {}: {}", path, err)))?;
        Ok(Some(sidecar))
    }

    async fn write_sidecar(&self, public_id: &str, sidecar: &Sidecar) -> Result<(), MediaError> {
        let path = self.sidecar_path(public_id);
        let json = serde_json::to_vec_pretty(sidecar)
            .map_err(|err| MediaError::Rejected(format!("could not encode sidecar: {}", err)))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|err| io_error(&path, err))
    }
}

fn io_error(path: &camino::Utf8Path, err: std::io::Error) -> MediaError {
    MediaError::Transient(format!("io error on {}: {}", path, err))
}

/// Only `[A-Za-z0-9_-]` segments separated by `/`, so a public_id can never
/// escape the store root.
fn validate_public_id(public_id: &str) -> Result<(), MediaError> {
    let valid = !public_id.is_empty()
        && public_id.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });
    if valid {
        Ok(())
    } else {
        Err(MediaError::Rejected(format!("invalid public_id {}", public_id)))
    }
}

#[async_trait]
impl MediaStoreProvider for LocalMediaStore {
    fn name(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self, request), fields(filename = %request.filename))]
    async fn upload(&self, request: &UploadRequest) -> Result<StoredObject, MediaError> {
        if request.data.is_empty() {
            return Err(MediaError::Rejected("empty file".to_owned()));
        }
        validate_public_id(&request.folder)?;
        let public_id = format!("{}/{}", request.folder, uuid::Uuid::new_v4().simple());
        let format =
            format_from_filename(&request.filename).unwrap_or_else(|| DEFAULT_FORMAT.to_owned());
        let dir = self.root.join(&request.folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| io_error(&dir, err))?;
        let blob_path = self.blob_path(&public_id, &format);
        tokio::fs::write(&blob_path, &request.data)
            .await
            .map_err(|err| io_error(&blob_path, err))?;
        let sidecar = Sidecar {
            format,
            bytes: request.data.len() as i64,
            created_at: Utc::now(),
            metadata: request.metadata.clone(),
        };
        self.write_sidecar(&public_id, &sidecar).await?;
        debug!(%public_id, "stored blob");
        Ok(self.stored_object(public_id, sidecar))
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> Result<RemoteOutcome, MediaError> {
        validate_public_id(public_id)?;
        let Some(sidecar) = self.read_sidecar(public_id).await? else {
            return Ok(RemoteOutcome::NotFound);
        };
        let blob_path = self.blob_path(public_id, &sidecar.format);
        match tokio::fs::remove_file(&blob_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_error(&blob_path, err)),
        }
        let sidecar_path = self.sidecar_path(public_id);
        tokio::fs::remove_file(&sidecar_path)
            .await
            .map_err(|err| io_error(&sidecar_path, err))?;
        Ok(RemoteOutcome::Done)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &ListFilter) -> Result<Vec<StoredObject>, MediaError> {
        validate_public_id(&filter.folder)?;
        let dir = self.root.join(&filter.folder);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&dir, err)),
        };
        let mut objects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error(&dir, err))?
        {
            let file_name = entry.file_name();
            let Some(stem) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(".json"))
            else {
                continue;
            };
            let public_id = format!("{}/{}", filter.folder, stem);
            if validate_public_id(&public_id).is_err() {
                continue;
            }
            if let Some(sidecar) = self.read_sidecar(&public_id).await? {
                objects.push(self.stored_object(public_id, sidecar));
            }
        }
        objects.sort_by(|a, b| a.public_id.cmp(&b.public_id));
        Ok(objects)
    }

    #[instrument(skip(self, metadata))]
    async fn update_metadata(
        &self,
        public_id: &str,
        metadata: &ObjectMetadata,
    ) -> Result<RemoteOutcome, MediaError> {
        validate_public_id(public_id)?;
        let Some(mut sidecar) = self.read_sidecar(public_id).await? else {
            return Ok(RemoteOutcome::NotFound);
        };
        sidecar.metadata = metadata.clone();
        self.write_sidecar(public_id, &sidecar).await?;
        Ok(RemoteOutcome::Done)
    }
}
