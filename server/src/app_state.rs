use std::sync::Arc;

use camino::Utf8PathBuf as PathBuf;
use sha2::{Digest, Sha256};

use galleria_core::catalog::Gallery;

use crate::session::SessionStore;

pub struct AppState {
    pub gallery: Gallery,
    pub sessions: SessionStore,
    admin_password_digest: [u8; 32],
    pub max_upload_bytes: usize,
    /// Served under `/media` when the local media store is used
    pub media_root: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        gallery: Gallery,
        admin_password: &str,
        max_upload_bytes: usize,
        media_root: Option<PathBuf>,
    ) -> Self {
        AppState {
            gallery,
            sessions: SessionStore::default(),
            admin_password_digest: Sha256::digest(admin_password.as_bytes()).into(),
            max_upload_bytes,
            media_root,
        }
    }

    /// Compares digests so the comparison does not depend on the password length.
    pub fn check_admin_password(&self, password: &str) -> bool {
        let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        digest == self.admin_password_digest
    }
}

pub type SharedState = Arc<AppState>;
