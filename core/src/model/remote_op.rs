use chrono::{DateTime, Utc};

use super::RemoteOpId;

/// Media store work recorded in the same transaction as the row change
/// that requires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOpKind {
    /// Rewrite the mirrored metadata of the object from its photo row
    SyncMetadata,
    /// Remove the object from the media store
    DestroyBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingRemoteOp {
    pub id: RemoteOpId,
    pub kind: RemoteOpKind,
    pub public_id: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Incremented each time the op is queued again before it completed
    pub generation: i32,
}
