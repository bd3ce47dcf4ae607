//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::model::{CourseError, LessonError, WatchError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the lesson gate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GateError {
    #[error("course not assigned")]
    NotAssigned,
    #[error("previous lesson must be completed first")]
    PreviousLessonIncomplete,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `VideoService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VideoServiceError {
    #[error("permission denied")]
    Forbidden,
    #[error("lesson not found")]
    LessonNotFound,
    #[error("course not assigned")]
    NotAssigned,
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CompletionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionServiceError {
    #[error("permission denied")]
    Forbidden,
    #[error("lesson not found")]
    LessonNotFound,
    #[error("course not assigned")]
    NotAssigned,
    #[error("course already completed")]
    CourseCompleted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("permission denied")]
    Forbidden,
    #[error("course not found")]
    CourseNotFound,
    #[error("already assigned")]
    AlreadyAssigned,
    #[error("course is not open for self-enrollment")]
    NotPublic,
    #[error("course not assigned")]
    NotAssigned,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error("permission denied")]
    Forbidden,
    #[error("course not found")]
    CourseNotFound,
    #[error("lesson order is already taken")]
    DuplicateOrder,
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LessonService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServiceError {
    #[error("permission denied")]
    Forbidden,
    #[error("lesson not found")]
    LessonNotFound,
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
