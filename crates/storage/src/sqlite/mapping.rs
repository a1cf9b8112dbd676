use bite_core::model::{Feedback, Fingerprint, ItemId, Like, Rating};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn item_id(row: &SqliteRow) -> Result<ItemId, StorageError> {
    let raw: String = row.try_get("item_id").map_err(ser)?;
    ItemId::new(raw).map_err(ser)
}

fn fingerprint(row: &SqliteRow) -> Result<Fingerprint, StorageError> {
    let raw: String = row.try_get("fingerprint").map_err(ser)?;
    Fingerprint::new(raw).ok_or_else(|| StorageError::Serialization("empty fingerprint".into()))
}

pub(crate) fn map_like_row(row: &SqliteRow) -> Result<Like, StorageError> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    Ok(Like {
        item_id: item_id(row)?,
        fingerprint: fingerprint(row)?,
        created_at,
    })
}

pub(crate) fn map_feedback_row(row: &SqliteRow) -> Result<Feedback, StorageError> {
    let rating: i64 = row.try_get("rating").map_err(ser)?;
    let rating = u8::try_from(rating)
        .map_err(|_| StorageError::Serialization(format!("rating out of range: {rating}")))?;
    let rating = Rating::new(rating).map_err(ser)?;
    let comment: Option<String> = row.try_get("comment").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    Ok(Feedback::new(
        item_id(row)?,
        fingerprint(row)?,
        rating,
        comment,
        created_at,
    ))
}
