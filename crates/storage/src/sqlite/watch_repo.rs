use chrono::{DateTime, Utc};
use lms_core::model::{LessonId, UserId, VideoProgress, WatchEvent};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_video_row},
};
use crate::repository::{StorageError, WatchRepository};

#[async_trait::async_trait]
impl WatchRepository for SqliteRepository {
    async fn upsert_watch(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        event: WatchEvent,
        now: DateTime<Utc>,
    ) -> Result<VideoProgress, StorageError> {
        // single conditional write: MAX() applies the ratchet inside the
        // statement, so two concurrent samples can never lose the higher
        // percent to a stale read
        let row = sqlx::query(
            r"
            INSERT INTO video_progress (user_id, lesson_id, position_sec, watched_percent, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                position_sec = excluded.position_sec,
                watched_percent = MAX(watched_percent, excluded.watched_percent),
                updated_at = excluded.updated_at
            RETURNING user_id, lesson_id, position_sec, watched_percent, updated_at
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .bind(i64::from(event.position_sec()))
        .bind(i64::from(event.watched_percent()))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        map_video_row(&row)
    }

    async fn get_watch(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<VideoProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, lesson_id, position_sec, watched_percent, updated_at
            FROM video_progress
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_video_row(&row).map(Some),
            None => Ok(None),
        }
    }
}
