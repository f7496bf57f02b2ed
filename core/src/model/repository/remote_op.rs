use chrono::Utc;
use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{
    util::{datetime_to_db_repr, to_db_remote_op_kind},
    PendingRemoteOp, RemoteOpId, RemoteOpKind,
};

use super::db::DbConn;
use super::db_entity::DbPendingRemoteOp;
use super::schema;

/// Queues `kind` for every object in `public_ids`.
/// An op already pending for the same object is not queued twice, its
/// generation is bumped instead so a drain that read the older generation
/// cannot complete it.
#[instrument(skip(conn), level = "trace")]
pub fn enqueue_remote_ops(
    conn: &mut DbConn,
    kind: RemoteOpKind,
    public_ids: &[String],
) -> Result<()> {
    use schema::PendingRemoteOp;
    if public_ids.is_empty() {
        return Ok(());
    }
    let now = datetime_to_db_repr(&Utc::now());
    let kind = to_db_remote_op_kind(kind);
    for public_id in public_ids {
        diesel::insert_into(PendingRemoteOp::table)
            .values((
                PendingRemoteOp::kind.eq(kind),
                PendingRemoteOp::public_id.eq(public_id),
                PendingRemoteOp::created_at.eq(now),
            ))
            .on_conflict((PendingRemoteOp::kind, PendingRemoteOp::public_id))
            .do_update()
            .set(PendingRemoteOp::generation.eq(PendingRemoteOp::generation + 1))
            .execute(conn)
            .wrap_err("error inserting into table PendingRemoteOp")?;
    }
    Ok(())
}

/// Pending ops in the order they were queued, starting after op `after`.
#[instrument(skip(conn), level = "trace")]
pub fn get_pending_remote_ops(
    conn: &mut DbConn,
    after: Option<RemoteOpId>,
    limit: i64,
) -> Result<Vec<PendingRemoteOp>> {
    use schema::PendingRemoteOp;
    let db_ops: Vec<DbPendingRemoteOp> = PendingRemoteOp::table
        .filter(PendingRemoteOp::op_id.gt(after.map(|id| id.0).unwrap_or(0)))
        .order_by(PendingRemoteOp::op_id.asc())
        .limit(limit)
        .select(DbPendingRemoteOp::as_select())
        .load(conn)
        .wrap_err("error querying table PendingRemoteOp")?;
    db_ops
        .into_iter()
        .map(|op| op.try_into())
        .collect::<Result<Vec<_>>>()
}

#[instrument(skip(conn), level = "trace")]
pub fn get_pending_public_ids(conn: &mut DbConn, kind: RemoteOpKind) -> Result<Vec<String>> {
    use schema::PendingRemoteOp;
    PendingRemoteOp::table
        .filter(PendingRemoteOp::kind.eq(to_db_remote_op_kind(kind)))
        .select(PendingRemoteOp::public_id)
        .load(conn)
        .wrap_err("error querying table PendingRemoteOp")
}

#[instrument(skip(conn), level = "trace")]
pub fn count_pending_remote_ops(conn: &mut DbConn) -> Result<i64> {
    use schema::PendingRemoteOp;
    PendingRemoteOp::table
        .count()
        .get_result(conn)
        .wrap_err("error counting rows in table PendingRemoteOp")
}

/// Removes op `id` if it is still at `generation`.
/// Returns false when the op was queued again in the meantime and stays pending.
#[instrument(skip(conn), level = "trace")]
pub fn complete_remote_op(conn: &mut DbConn, id: RemoteOpId, generation: i32) -> Result<bool> {
    use schema::PendingRemoteOp;
    let deleted = diesel::delete(
        PendingRemoteOp::table
            .filter(PendingRemoteOp::op_id.eq(id.0))
            .filter(PendingRemoteOp::generation.eq(generation)),
    )
    .execute(conn)
    .wrap_err("error deleting from table PendingRemoteOp")?;
    Ok(deleted > 0)
}

#[instrument(skip(conn), level = "trace")]
pub fn record_remote_op_failure(conn: &mut DbConn, id: RemoteOpId, error: &str) -> Result<()> {
    use schema::PendingRemoteOp;
    diesel::update(PendingRemoteOp::table.find(id.0))
        .set((
            PendingRemoteOp::attempts.eq(PendingRemoteOp::attempts + 1),
            PendingRemoteOp::last_error.eq(error),
        ))
        .execute(conn)
        .wrap_err("error updating table PendingRemoteOp")?;
    Ok(())
}
