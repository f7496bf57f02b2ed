use diesel::{Queryable, Selectable};

use crate::model::{util::datetime_from_db_repr, Collection, CollectionId};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::Collection)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbCollection {
    pub collection_id: i64,
    pub name: String,
    pub name_key: String,
    pub created_at: i64,
}

impl TryFrom<DbCollection> for Collection {
    type Error = eyre::Report;

    fn try_from(value: DbCollection) -> Result<Self, Self::Error> {
        Ok(Collection {
            id: CollectionId(value.collection_id),
            name: value.name,
            created_at: datetime_from_db_repr(value.created_at)?,
        })
    }
}
