use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, EnrollmentStatus, Lesson, LessonDraft, LessonId,
    UserId, VideoProgress,
};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn enrollment_id_from_i64(v: i64) -> Result<EnrollmentId, StorageError> {
    Ok(EnrollmentId::new(i64_to_u64("enrollment_id", v)?))
}

pub(crate) fn parse_status(s: &str) -> Result<EnrollmentStatus, StorageError> {
    EnrollmentStatus::parse(s).map_err(ser)
}

/// Maps an insert failure, turning a uniqueness violation into `Conflict`.
pub(crate) fn insert_error(e: sqlx::Error) -> StorageError {
    if e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

pub(crate) fn map_course_row(row: &sqlx::sqlite::SqliteRow) -> Result<Course, StorageError> {
    let deadline_days = row
        .try_get::<Option<i64>, _>("deadline_days")
        .map_err(ser)?
        .map(|d| {
            u32::try_from(d)
                .map_err(|_| StorageError::Serialization(format!("invalid deadline_days: {d}")))
        })
        .transpose()?;

    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<i64, _>("is_mandatory").map_err(ser)? != 0,
        deadline_days,
        row.try_get::<i64, _>("is_public").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    let ord_i64: i64 = row.try_get("ord").map_err(ser)?;
    let order = u32::try_from(ord_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid ord: {ord_i64}")))?;

    let draft = LessonDraft {
        course_id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        order,
        title: row.try_get::<String, _>("title").map_err(ser)?,
        video_url: row.try_get::<Option<String>, _>("video_url").map_err(ser)?,
        content: row.try_get::<Option<String>, _>("content").map_err(ser)?,
    };
    let id = lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    Ok(draft.validate().map_err(ser)?.assign_id(id))
}

pub(crate) fn map_enrollment_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Enrollment, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;
    let percent_i64: i64 = row.try_get("progress_percent").map_err(ser)?;
    let percent = u8::try_from(percent_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid progress_percent: {percent_i64}"))
    })?;

    Enrollment::new(
        enrollment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        parse_status(&status_str)?,
        percent,
        row.try_get("deadline_at").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_video_row(row: &sqlx::sqlite::SqliteRow) -> Result<VideoProgress, StorageError> {
    let position_i64: i64 = row.try_get("position_sec").map_err(ser)?;
    let position_sec = u32::try_from(position_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid position_sec: {position_i64}")))?;

    let percent_i64: i64 = row.try_get("watched_percent").map_err(ser)?;
    let watched_percent = u8::try_from(percent_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid watched_percent: {percent_i64}"))
    })?;

    Ok(VideoProgress {
        user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        lesson_id: lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        position_sec,
        watched_percent,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}
