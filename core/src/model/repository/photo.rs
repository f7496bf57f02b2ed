use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{
    util::datetime_to_db_repr, CollectionId, CreatePhoto, Photo, PhotoEntry, PhotoFilter, PhotoId,
};

use super::db::DbConn;
use super::db_entity::DbPhoto;
use super::schema;

#[instrument(skip(conn, photo), level = "trace")]
pub fn insert_photo(conn: &mut DbConn, photo: &CreatePhoto) -> Result<PhotoId> {
    use schema::Photo;
    let id = diesel::insert_into(Photo::table)
        .values((
            Photo::title.eq(&photo.title),
            Photo::description.eq(photo.description.as_deref()),
            Photo::public_id.eq(&photo.public_id),
            Photo::url.eq(&photo.url),
            Photo::secure_url.eq(&photo.secure_url),
            Photo::original_filename.eq(photo.original_filename.as_deref()),
            Photo::file_format.eq(photo.file_format.as_deref()),
            Photo::file_size.eq(photo.file_size),
            Photo::width.eq(photo.width),
            Photo::height.eq(photo.height),
            Photo::uploaded_at.eq(datetime_to_db_repr(&photo.uploaded_at)),
            Photo::collection_id.eq(photo.collection_id.map(|id| id.0)),
        ))
        .returning(Photo::photo_id)
        .get_result(conn)
        .wrap_err("error inserting into table Photo")?;
    Ok(PhotoId(id))
}

#[instrument(skip(conn), level = "trace")]
pub fn get_photo(conn: &mut DbConn, id: PhotoId) -> Result<Option<Photo>> {
    use schema::Photo;
    let db_photo: Option<DbPhoto> = Photo::table
        .find(id.0)
        .select(DbPhoto::as_select())
        .first(conn)
        .optional()
        .wrap_err("error querying table Photo")?;
    db_photo.map(|p| p.try_into()).transpose()
}

#[instrument(skip(conn), level = "trace")]
pub fn get_photo_by_public_id(conn: &mut DbConn, public_id: &str) -> Result<Option<Photo>> {
    use schema::Photo;
    let db_photo: Option<DbPhoto> = Photo::table
        .filter(Photo::public_id.eq(public_id))
        .select(DbPhoto::as_select())
        .first(conn)
        .optional()
        .wrap_err("error querying table Photo by public_id")?;
    db_photo.map(|p| p.try_into()).transpose()
}

#[instrument(skip(conn), level = "trace")]
pub fn get_photo_entry(conn: &mut DbConn, id: PhotoId) -> Result<Option<PhotoEntry>> {
    use schema::{Collection, Photo};
    let row: Option<(DbPhoto, Option<String>)> = Photo::table
        .left_join(Collection::table)
        .filter(Photo::photo_id.eq(id.0))
        .select((DbPhoto::as_select(), Collection::name.nullable()))
        .first(conn)
        .optional()
        .wrap_err("error querying tables Photo, Collection")?;
    row.map(|(db_photo, collection_name)| {
        Ok(PhotoEntry {
            photo: db_photo.try_into()?,
            collection_name,
        })
    })
    .transpose()
}

/// Photos matching `filter`, most recently uploaded first.
#[instrument(skip(conn), level = "trace")]
pub fn get_photos(conn: &mut DbConn, filter: &PhotoFilter) -> Result<Vec<PhotoEntry>> {
    use schema::{Collection, Photo};
    let mut query = Photo::table
        .left_join(Collection::table)
        .select((DbPhoto::as_select(), Collection::name.nullable()))
        .order_by((Photo::uploaded_at.desc(), Photo::photo_id.desc()))
        .into_boxed();
    if let Some(collection_id) = filter.collection_id {
        query = query.filter(Photo::collection_id.eq(collection_id.0));
    }
    let rows: Vec<(DbPhoto, Option<String>)> = query
        .load(conn)
        .wrap_err("error querying tables Photo, Collection")?;
    rows.into_iter()
        .map(|(db_photo, collection_name)| {
            Ok(PhotoEntry {
                photo: db_photo.try_into()?,
                collection_name,
            })
        })
        .collect::<Result<Vec<_>>>()
}

#[instrument(skip(conn), level = "trace")]
pub fn get_all_public_ids(conn: &mut DbConn) -> Result<Vec<String>> {
    use schema::Photo;
    Photo::table
        .select(Photo::public_id)
        .load(conn)
        .wrap_err("error querying column Photo.public_id")
}

#[instrument(skip(conn), level = "trace")]
pub fn get_public_ids_in_collection(
    conn: &mut DbConn,
    collection_id: CollectionId,
) -> Result<Vec<String>> {
    use schema::Photo;
    Photo::table
        .filter(Photo::collection_id.eq(collection_id.0))
        .select(Photo::public_id)
        .load(conn)
        .wrap_err("error querying column Photo.public_id")
}

#[instrument(skip(conn), level = "trace")]
pub fn count_photos_in_collection(conn: &mut DbConn, collection_id: CollectionId) -> Result<i64> {
    use schema::Photo;
    Photo::table
        .filter(Photo::collection_id.eq(collection_id.0))
        .count()
        .get_result(conn)
        .wrap_err("error counting rows in table Photo")
}

/// Sets (or clears, for `None`) the collection of every photo in `ids`.
/// Returns the public_ids of the photos that exist and were updated.
#[instrument(skip(conn), level = "trace")]
pub fn set_collection_for_photos(
    conn: &mut DbConn,
    ids: &[PhotoId],
    collection_id: Option<CollectionId>,
) -> Result<Vec<String>> {
    use schema::Photo;
    let raw_ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
    let public_ids: Vec<String> = Photo::table
        .filter(Photo::photo_id.eq_any(&raw_ids))
        .select(Photo::public_id)
        .load(conn)
        .wrap_err("error querying table Photo")?;
    diesel::update(Photo::table.filter(Photo::photo_id.eq_any(&raw_ids)))
        .set(Photo::collection_id.eq(collection_id.map(|id| id.0)))
        .execute(conn)
        .wrap_err("error updating column Photo.collection_id")?;
    Ok(public_ids)
}

/// Clears the collection reference of every photo in the collection.
/// Returns the public_ids of the photos that were unassigned.
#[instrument(skip(conn), level = "trace")]
pub fn unassign_collection(conn: &mut DbConn, collection_id: CollectionId) -> Result<Vec<String>> {
    use schema::Photo;
    let public_ids: Vec<String> = Photo::table
        .filter(Photo::collection_id.eq(collection_id.0))
        .select(Photo::public_id)
        .load(conn)
        .wrap_err("error querying table Photo")?;
    diesel::update(Photo::table.filter(Photo::collection_id.eq(collection_id.0)))
        .set(Photo::collection_id.eq(None::<i64>))
        .execute(conn)
        .wrap_err("error clearing column Photo.collection_id")?;
    Ok(public_ids)
}

/// Deletes the rows of all photos in `ids` that exist.
/// Returns the public_ids of the deleted photos.
#[instrument(skip(conn), level = "trace")]
pub fn delete_photos(conn: &mut DbConn, ids: &[PhotoId]) -> Result<Vec<String>> {
    use schema::Photo;
    let raw_ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
    let public_ids: Vec<String> = Photo::table
        .filter(Photo::photo_id.eq_any(&raw_ids))
        .select(Photo::public_id)
        .load(conn)
        .wrap_err("error querying table Photo")?;
    diesel::delete(Photo::table.filter(Photo::photo_id.eq_any(&raw_ids)))
        .execute(conn)
        .wrap_err("error deleting from table Photo")?;
    Ok(public_ids)
}
