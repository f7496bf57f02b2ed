use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Notify, Semaphore};

use super::{
    format_from_filename, ListFilter, MediaError, MediaStoreProvider, ObjectMetadata,
    RemoteOutcome, StoredObject, UploadRequest,
};

/// In-memory media store with failure injection.
#[derive(Debug, Default)]
pub struct FakeMediaStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    calls: AtomicU32,
    transient_failures_left: AtomicU32,
    unavailable: Mutex<bool>,
    rejected_filenames: Mutex<HashSet<String>>,
    next_id: AtomicU32,
    listed_only: Mutex<Vec<StoredObject>>,
    metadata_gate: Mutex<Option<Arc<Semaphore>>>,
    metadata_waiting: Notify,
}

impl FakeMediaStore {
    /// The next `n` calls fail with a transient error.
    pub fn fail_next_transient(&self, n: u32) {
        self.transient_failures_left.store(n, Ordering::SeqCst);
    }

    /// While set, every call fails with a transient error.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn reject_uploads_of(&self, filename: &str) {
        self.rejected_filenames
            .lock()
            .unwrap()
            .insert(filename.to_owned());
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn insert_object(&self, object: StoredObject) {
        self.objects
            .lock()
            .unwrap()
            .insert(object.public_id.clone(), object);
    }

    pub fn object(&self, public_id: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(public_id).cloned()
    }

    pub fn public_ids(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// `object` shows up in listings but is already gone for every other call,
    /// like a stale page of a paginated listing.
    pub fn insert_listed_only(&self, object: StoredObject) {
        self.listed_only.lock().unwrap().push(object);
    }

    /// Metadata updates block until `release_metadata_updates`.
    pub fn hold_metadata_updates(&self) {
        *self.metadata_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_metadata_updates(&self) {
        if let Some(gate) = self.metadata_gate.lock().unwrap().take() {
            gate.close();
        }
    }

    /// Resolves once a metadata update is blocked on the gate.
    pub async fn metadata_update_waiting(&self) {
        self.metadata_waiting.notified().await;
    }

    fn check_available(&self) -> Result<(), MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.unavailable.lock().unwrap() {
            return Err(MediaError::Transient("store unavailable".to_owned()));
        }
        let injected = self
            .transient_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(MediaError::Transient("injected failure".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaStoreProvider for FakeMediaStore {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<StoredObject, MediaError> {
        self.check_available()?;
        if self
            .rejected_filenames
            .lock()
            .unwrap()
            .contains(&request.filename)
        {
            return Err(MediaError::Rejected(format!(
                "invalid image file {}",
                request.filename
            )));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let public_id = format!("{}/fake{}", request.folder, n);
        let object = StoredObject {
            url: format!("http://fake/{public_id}"),
            secure_url: format!("https://fake/{public_id}"),
            public_id: public_id.clone(),
            format: format_from_filename(&request.filename),
            bytes: Some(request.data.len() as i64),
            width: Some(640),
            height: Some(480),
            created_at: Utc::now(),
            metadata: request.metadata.clone(),
        };
        self.insert_object(object.clone());
        Ok(object)
    }

    async fn delete(&self, public_id: &str) -> Result<RemoteOutcome, MediaError> {
        self.check_available()?;
        match self.objects.lock().unwrap().remove(public_id) {
            Some(_) => Ok(RemoteOutcome::Done),
            None => Ok(RemoteOutcome::NotFound),
        }
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<StoredObject>, MediaError> {
        self.check_available()?;
        let prefix = format!("{}/", filter.folder);
        let mut listed: Vec<StoredObject> = self
            .objects
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        listed.extend(self.listed_only.lock().unwrap().iter().cloned());
        Ok(listed
            .into_iter()
            .filter(|object| object.public_id.starts_with(&prefix))
            .collect())
    }

    async fn update_metadata(
        &self,
        public_id: &str,
        metadata: &ObjectMetadata,
    ) -> Result<RemoteOutcome, MediaError> {
        self.check_available()?;
        let gate = self.metadata_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.metadata_waiting.notify_one();
            // closed on release
            let _ = gate.acquire().await;
        }
        match self.objects.lock().unwrap().get_mut(public_id) {
            Some(object) => {
                object.metadata = metadata.clone();
                Ok(RemoteOutcome::Done)
            }
            None => Ok(RemoteOutcome::NotFound),
        }
    }
}
