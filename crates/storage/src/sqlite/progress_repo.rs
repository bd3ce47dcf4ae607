use chrono::{DateTime, Utc};
use lms_core::model::{CourseId, EnrollmentProgress, EnrollmentStatus, Lesson, LessonId, UserId};
use lms_core::progress;
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_i64, lesson_id_from_i64, parse_status},
};
use crate::repository::{CompletionRepository, ProgressPersistence, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait::async_trait]
impl CompletionRepository for SqliteRepository {
    async fn completion_exists(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
            SELECT 1 FROM lesson_completions
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn completed_lessons(&self, user_id: UserId) -> Result<Vec<LessonId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT lesson_id FROM lesson_completions
            WHERE user_id = ?1
            ORDER BY lesson_id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(lesson_id_from_i64(
                row.try_get::<i64, _>("lesson_id").map_err(ser)?,
            )?);
        }
        Ok(out)
    }

    async fn completed_count(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM lesson_completions c
            JOIN lessons l ON l.id = c.lesson_id
            WHERE c.user_id = ?1 AND l.course_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32::try_from(count)
            .map_err(|_| StorageError::Serialization(format!("invalid completion count: {count}")))
    }
}

#[async_trait::async_trait]
impl ProgressPersistence for SqliteRepository {
    async fn apply_completion(
        &self,
        user_id: UserId,
        lesson: &Lesson,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentProgress, StorageError> {
        let user = id_i64("user_id", user_id.value())?;
        let lesson_id = id_i64("lesson_id", lesson.id.value())?;
        let course = id_i64("course_id", lesson.course_id.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // the caller's precondition checks may have raced; re-read inside
        // the transaction before touching the ledger
        let current = enrollment_status(&mut tx, user, course).await?;
        if current.is_terminal() {
            return Err(StorageError::Conflict);
        }

        if completed {
            sqlx::query(
                r"
                INSERT INTO lesson_completions (user_id, lesson_id, completed_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, lesson_id) DO NOTHING
                ",
            )
            .bind(user)
            .bind(lesson_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        } else {
            sqlx::query(
                r"
                DELETE FROM lesson_completions
                WHERE user_id = ?1 AND lesson_id = ?2
                ",
            )
            .bind(user)
            .bind(lesson_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        let outcome = recompute_enrollment(&mut tx, user, course, current, now).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(outcome)
    }

    async fn reconcile(
        &self,
        user_id: UserId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentProgress, StorageError> {
        let user = id_i64("user_id", user_id.value())?;
        let course = id_i64("course_id", course_id.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let current = enrollment_status(&mut tx, user, course).await?;
        let outcome = recompute_enrollment(&mut tx, user, course, current, now).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(outcome)
    }
}

async fn enrollment_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user: i64,
    course: i64,
) -> Result<EnrollmentStatus, StorageError> {
    let row = sqlx::query(
        r"
        SELECT status FROM enrollments
        WHERE user_id = ?1 AND course_id = ?2
        ",
    )
    .bind(user)
    .bind(course)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;

    let Some(row) = row else {
        return Err(StorageError::NotFound);
    };
    let status: String = row.try_get("status").map_err(ser)?;
    parse_status(&status)
}

/// Counts ledger facts and writes the derived percent/status back, all on
/// the caller's transaction.
///
/// `completed_at` is stamped only when the row first reaches COMPLETED; the
/// CASE leaves an existing stamp untouched.
async fn recompute_enrollment(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user: i64,
    course: i64,
    current: EnrollmentStatus,
    now: DateTime<Utc>,
) -> Result<EnrollmentProgress, StorageError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = ?1")
        .bind(course)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    let done: i64 = sqlx::query_scalar(
        r"
        SELECT COUNT(*)
        FROM lesson_completions c
        JOIN lessons l ON l.id = c.lesson_id
        WHERE c.user_id = ?1 AND l.course_id = ?2
        ",
    )
    .bind(user)
    .bind(course)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;

    let total = u32::try_from(total)
        .map_err(|_| StorageError::Serialization(format!("invalid lesson count: {total}")))?;
    let done = u32::try_from(done)
        .map_err(|_| StorageError::Serialization(format!("invalid completion count: {done}")))?;

    let outcome = progress::recompute(current, done, total);

    sqlx::query(
        r"
        UPDATE enrollments SET
            progress_percent = ?3,
            status = ?4,
            completed_at = CASE
                WHEN ?4 = 'COMPLETED' AND completed_at IS NULL THEN ?5
                ELSE completed_at
            END
        WHERE user_id = ?1 AND course_id = ?2
        ",
    )
    .bind(user)
    .bind(course)
    .bind(i64::from(outcome.percent))
    .bind(outcome.status.as_str())
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;

    Ok(outcome)
}
