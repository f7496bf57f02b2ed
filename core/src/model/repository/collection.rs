use chrono::{DateTime, Utc};
use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{
    collection_name_key,
    util::{datetime_from_db_repr, datetime_to_db_repr},
    Collection, CollectionId, CollectionWithCount,
};

use super::db::DbConn;
use super::db_entity::DbCollection;
use super::schema;

#[derive(Debug, Clone, QueryableByName)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct CollectionCountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub collection_id: i64,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub name: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub created_at: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub photo_count: i64,
}

impl TryFrom<CollectionCountRow> for CollectionWithCount {
    type Error = eyre::Report;

    fn try_from(row: CollectionCountRow) -> Result<Self, Self::Error> {
        Ok(CollectionWithCount {
            collection: Collection {
                id: CollectionId(row.collection_id),
                name: row.name,
                created_at: datetime_from_db_repr(row.created_at)?,
            },
            photo_count: row.photo_count,
        })
    }
}

#[instrument(skip(conn), level = "trace")]
pub fn get_collection(conn: &mut DbConn, id: CollectionId) -> Result<Option<Collection>> {
    use schema::Collection;
    let db_collection: Option<DbCollection> = Collection::table
        .find(id.0)
        .select(DbCollection::as_select())
        .first(conn)
        .optional()
        .wrap_err("error querying table Collection")?;
    db_collection.map(|c| c.try_into()).transpose()
}

/// All collections, newest first, each with the number of photos referencing it
/// at the time of the query.
#[instrument(skip(conn), level = "trace")]
pub fn get_collections_with_photo_count(conn: &mut DbConn) -> Result<Vec<CollectionWithCount>> {
    let rows: Vec<CollectionCountRow> = diesel::sql_query(
        r#"
SELECT c.collection_id, c.name, c.created_at, COUNT(p.photo_id) AS photo_count
FROM Collection c
LEFT JOIN Photo p ON p.collection_id = c.collection_id
GROUP BY c.collection_id
ORDER BY c.created_at DESC, c.collection_id DESC;
    "#,
    )
    .load(conn)
    .wrap_err("error querying tables Collection, Photo")?;
    rows.into_iter()
        .map(|row| row.try_into())
        .collect::<Result<Vec<_>>>()
}

#[instrument(skip(conn), level = "trace")]
pub fn get_collection_with_photo_count(
    conn: &mut DbConn,
    id: CollectionId,
) -> Result<Option<CollectionWithCount>> {
    let row: Option<CollectionCountRow> = diesel::sql_query(
        r#"
SELECT c.collection_id, c.name, c.created_at, COUNT(p.photo_id) AS photo_count
FROM Collection c
LEFT JOIN Photo p ON p.collection_id = c.collection_id
WHERE c.collection_id = ?
GROUP BY c.collection_id;
    "#,
    )
    .bind::<diesel::sql_types::BigInt, _>(id.0)
    .get_result(conn)
    .optional()
    .wrap_err("error querying tables Collection, Photo")?;
    row.map(|row| row.try_into()).transpose()
}

/// Finds a collection whose name equals `name` ignoring case,
/// optionally ignoring the collection `excluding` (the one being renamed).
#[instrument(skip(conn), level = "trace")]
pub fn find_collection_with_name(
    conn: &mut DbConn,
    name: &str,
    excluding: Option<CollectionId>,
) -> Result<Option<Collection>> {
    use schema::Collection;
    let mut query = Collection::table
        .filter(Collection::name_key.eq(collection_name_key(name)))
        .select(DbCollection::as_select())
        .into_boxed();
    if let Some(excluding) = excluding {
        query = query.filter(Collection::collection_id.ne(excluding.0));
    }
    let db_collection: Option<DbCollection> = query
        .first(conn)
        .optional()
        .wrap_err("error querying table Collection by name")?;
    db_collection.map(|c| c.try_into()).transpose()
}

#[instrument(skip(conn), level = "trace")]
pub fn insert_collection(
    conn: &mut DbConn,
    name: &str,
    created_at: DateTime<Utc>,
) -> Result<CollectionId> {
    use schema::Collection;
    let id = diesel::insert_into(Collection::table)
        .values((
            Collection::name.eq(name),
            Collection::name_key.eq(collection_name_key(name)),
            Collection::created_at.eq(datetime_to_db_repr(&created_at)),
        ))
        .returning(Collection::collection_id)
        .get_result(conn)?;
    Ok(CollectionId(id))
}

/// Returns the number of rows changed, 0 if the collection does not exist.
#[instrument(skip(conn), level = "trace")]
pub fn rename_collection(conn: &mut DbConn, id: CollectionId, name: &str) -> Result<usize> {
    use schema::Collection;
    let affected = diesel::update(Collection::table.find(id.0))
        .set((
            Collection::name.eq(name),
            Collection::name_key.eq(collection_name_key(name)),
        ))
        .execute(conn)?;
    Ok(affected)
}

/// Removes the Collection row only. Photos referencing it must have been
/// unassigned before, see [`super::photo::unassign_collection`].
#[instrument(skip(conn), level = "trace")]
pub fn delete_collection(conn: &mut DbConn, id: CollectionId) -> Result<usize> {
    use schema::Collection;
    let affected = diesel::delete(Collection::table.find(id.0))
        .execute(conn)
        .wrap_err("error deleting from table Collection")?;
    Ok(affected)
}
