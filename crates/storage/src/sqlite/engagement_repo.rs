use async_trait::async_trait;
use bite_core::model::{Feedback, Fingerprint, ItemId, Like};

use super::SqliteRepository;
use super::mapping::{map_feedback_row, map_like_row};
use crate::repository::{EngagementRepository, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl EngagementRepository for SqliteRepository {
    async fn insert_like(&self, like: &Like) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO likes (item_id, fingerprint, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(item_id, fingerprint) DO NOTHING
            ",
        )
        .bind(like.item_id.as_str())
        .bind(like.fingerprint.as_str())
        .bind(like.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn delete_like(
        &self,
        item_id: &ItemId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM likes WHERE item_id = ?1 AND fingerprint = ?2")
            .bind(item_id.as_str())
            .bind(fingerprint.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_likes(&self, item_id: &ItemId) -> Result<Vec<Like>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT item_id, fingerprint, created_at
            FROM likes
            WHERE item_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(item_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_like_row).collect()
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO feedback (item_id, fingerprint, rating, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(feedback.item_id.as_str())
        .bind(feedback.fingerprint.as_str())
        .bind(i64::from(feedback.rating.value()))
        .bind(feedback.comment.as_deref())
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_feedback(&self, item_id: &ItemId) -> Result<Vec<Feedback>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT item_id, fingerprint, rating, comment, created_at
            FROM feedback
            WHERE item_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(item_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_feedback_row).collect()
    }

    async fn list_all_likes(&self) -> Result<Vec<Like>, StorageError> {
        let rows = sqlx::query(
            "SELECT item_id, fingerprint, created_at FROM likes ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_like_row).collect()
    }

    async fn list_all_feedback(&self) -> Result<Vec<Feedback>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT item_id, fingerprint, rating, comment, created_at
            FROM feedback
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_feedback_row).collect()
    }
}
