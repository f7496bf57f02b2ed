use chrono::{DateTime, TimeZone, Utc};
use eyre::{eyre, Result};

use super::RemoteOpKind;

/// milliseconds since UNIX epoch
pub fn datetime_to_db_repr(d: &DateTime<Utc>) -> i64 {
    d.timestamp_millis()
}

/// From milliseconds since UNIX epoch
pub fn datetime_from_db_repr(unix_millis: i64) -> Result<DateTime<Utc>> {
    match Utc.timestamp_millis_opt(unix_millis) {
        chrono::LocalResult::Single(dt) => Ok(dt),
        _ => Err(eyre!(
            "error converting unix millis epoch to DateTime: {}",
            unix_millis
        )),
    }
}

pub fn to_db_remote_op_kind(kind: RemoteOpKind) -> i32 {
    match kind {
        RemoteOpKind::SyncMetadata => 0,
        RemoteOpKind::DestroyBlob => 1,
    }
}

pub fn from_db_remote_op_kind(i: i32) -> Result<RemoteOpKind> {
    match i {
        0 => Ok(RemoteOpKind::SyncMetadata),
        1 => Ok(RemoteOpKind::DestroyBlob),
        other => Err(eyre!("invalid db remote op kind {}", other)),
    }
}
