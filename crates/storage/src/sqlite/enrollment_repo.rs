use lms_core::model::{CourseId, Enrollment, EnrollmentId, UserId};

use super::{
    SqliteRepository,
    mapping::{enrollment_id_from_i64, id_i64, insert_error, map_enrollment_row},
};
use crate::repository::{EnrollmentRepository, NewEnrollmentRecord, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_new_enrollment(
        &self,
        record: NewEnrollmentRecord,
    ) -> Result<EnrollmentId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, status, progress_percent, deadline_at, started_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            ",
        )
        .bind(id_i64("user_id", record.user_id.value())?)
        .bind(id_i64("course_id", record.course_id.value())?)
        .bind(record.status.as_str())
        .bind(record.deadline_at)
        .bind(record.started_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        enrollment_id_from_i64(res.last_insert_rowid())
    }

    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, course_id, status, progress_percent, deadline_at, started_at, completed_at
            FROM enrollments
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_enrollment_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn enrollments_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, course_id, status, progress_percent, deadline_at, started_at, completed_at
            FROM enrollments
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut enrollments = Vec::with_capacity(rows.len());
        for row in rows {
            enrollments.push(map_enrollment_row(&row)?);
        }
        Ok(enrollments)
    }

    async fn mark_started(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), StorageError> {
        // the CASE keeps the statement matching (and counting) the row even
        // when the status is already past ASSIGNED, so zero rows means the
        // enrollment does not exist
        let res = sqlx::query(
            r"
            UPDATE enrollments
            SET status = CASE WHEN status = 'ASSIGNED' THEN 'IN_PROGRESS' ELSE status END
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
