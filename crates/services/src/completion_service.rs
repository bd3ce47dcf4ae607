use std::sync::Arc;

use tracing::info;

use lms_core::model::{
    AuthenticatedUser, Capability, EnrollmentProgress, EnrollmentStatus, LessonId,
};
use storage::repository::{
    CatalogRepository, EnrollmentRepository, ProgressPersistence, StorageError,
};

use crate::Clock;
use crate::error::CompletionServiceError;

/// Maintains the lesson completion ledger and keeps the enrollment aggregate
/// in step with it.
#[derive(Clone)]
pub struct CompletionService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressPersistence>,
}

impl CompletionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressPersistence>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
            progress,
        }
    }

    /// Mark or unmark a lesson as completed and return the recomputed
    /// enrollment progress.
    ///
    /// Both directions are idempotent: marking an already-marked lesson and
    /// unmarking an absent one change nothing and still return the current
    /// aggregate. The ledger mutation and the recompute run in one storage
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `CompletionServiceError::Forbidden` when the caller cannot
    /// take courses, `LessonNotFound` for an unknown lesson, `NotAssigned`
    /// when the caller holds no enrollment in the lesson's course,
    /// `CourseCompleted` when that enrollment is already terminal, and
    /// `Storage` if persistence fails.
    pub async fn set_completion(
        &self,
        caller: &AuthenticatedUser,
        lesson_id: LessonId,
        completed: bool,
    ) -> Result<EnrollmentProgress, CompletionServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(CompletionServiceError::Forbidden);
        }
        let lesson = self
            .catalog
            .get_lesson(lesson_id)
            .await?
            .ok_or(CompletionServiceError::LessonNotFound)?;
        let enrollment = self
            .enrollments
            .get_enrollment(caller.id, lesson.course_id)
            .await?
            .ok_or(CompletionServiceError::NotAssigned)?;
        if enrollment.status().is_terminal() {
            return Err(CompletionServiceError::CourseCompleted);
        }

        let outcome = self
            .progress
            .apply_completion(caller.id, &lesson, completed, self.clock.now())
            .await
            .map_err(|e| match e {
                // the storage unit re-checks inside its transaction; a
                // racing assign/complete since the reads above lands here
                StorageError::NotFound => CompletionServiceError::NotAssigned,
                StorageError::Conflict => CompletionServiceError::CourseCompleted,
                other => CompletionServiceError::Storage(other),
            })?;

        if outcome.status == EnrollmentStatus::Completed {
            info!(
                "course completed user={} course={}",
                caller.id, lesson.course_id
            );
        }
        Ok(outcome)
    }
}
