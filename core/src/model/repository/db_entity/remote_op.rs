use diesel::{Queryable, Selectable};

use crate::model::{
    util::{datetime_from_db_repr, from_db_remote_op_kind},
    PendingRemoteOp, RemoteOpId,
};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::PendingRemoteOp)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbPendingRemoteOp {
    pub op_id: i64,
    pub kind: i32,
    pub public_id: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub generation: i32,
}

impl TryFrom<DbPendingRemoteOp> for PendingRemoteOp {
    type Error = eyre::Report;

    fn try_from(value: DbPendingRemoteOp) -> Result<Self, Self::Error> {
        Ok(PendingRemoteOp {
            id: RemoteOpId(value.op_id),
            kind: from_db_remote_op_kind(value.kind)?,
            public_id: value.public_id,
            attempts: value.attempts,
            last_error: value.last_error,
            created_at: datetime_from_db_repr(value.created_at)?,
            generation: value.generation,
        })
    }
}
