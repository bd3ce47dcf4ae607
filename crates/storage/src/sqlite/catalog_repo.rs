use lms_core::model::{Course, CourseId, Lesson, LessonId};

use super::{
    SqliteRepository,
    mapping::{course_id_from_i64, id_i64, insert_error, lesson_id_from_i64, map_course_row,
        map_lesson_row},
};
use crate::repository::{CatalogRepository, NewCourseRecord, NewLessonRecord, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn insert_new_course(&self, record: NewCourseRecord) -> Result<CourseId, StorageError> {
        let deadline_days = record.deadline_days.map(i64::from);
        let is_mandatory = if record.is_mandatory { 1 } else { 0 };
        let is_public = if record.is_public { 1 } else { 0 };

        let res = sqlx::query(
            r"
            INSERT INTO courses (title, description, is_mandatory, deadline_days, is_public, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(record.title)
        .bind(record.description)
        .bind(is_mandatory)
        .bind(deadline_days)
        .bind(is_public)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        course_id_from_i64(res.last_insert_rowid())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, is_mandatory, deadline_days, is_public, created_at
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_course_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, is_mandatory, deadline_days, is_public, created_at
            FROM courses
            ORDER BY id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(map_course_row(&row)?);
        }
        Ok(courses)
    }

    async fn insert_new_lesson(&self, record: NewLessonRecord) -> Result<LessonId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO lessons (course_id, ord, title, video_url, content)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_i64("course_id", record.course_id.value())?)
        .bind(i64::from(record.order))
        .bind(record.title)
        .bind(record.video_url)
        .bind(record.content)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        lesson_id_from_i64(res.last_insert_rowid())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, ord, title, video_url, content
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id_i64("lesson_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_lesson_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, ord, title, video_url, content
            FROM lessons
            WHERE course_id = ?1
            ORDER BY ord ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in rows {
            lessons.push(map_lesson_row(&row)?);
        }
        Ok(lessons)
    }

    async fn lesson_by_order(
        &self,
        course_id: CourseId,
        order: u32,
    ) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, ord, title, video_url, content
            FROM lessons
            WHERE course_id = ?1 AND ord = ?2
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .bind(i64::from(order))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_lesson_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn lesson_count(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = ?1")
            .bind(id_i64("course_id", course_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32::try_from(count)
            .map_err(|_| StorageError::Serialization(format!("invalid lesson count: {count}")))
    }
}
