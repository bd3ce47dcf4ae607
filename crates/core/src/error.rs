use thiserror::Error;

use crate::model::{CourseError, EnrollmentError, LessonError, WatchError};

/// Convenience union of the domain validation errors.
///
/// Services usually keep the specific error; this exists for callers that
/// only care that validation failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Watch(#[from] WatchError),
}
