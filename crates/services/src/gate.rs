use std::sync::Arc;

use lms_core::model::{Lesson, UserId};
use storage::repository::{CatalogRepository, CompletionRepository, EnrollmentRepository};

use crate::error::GateError;

/// Enforces sequential lesson access.
///
/// The first lesson of a course opens as soon as an enrollment exists;
/// any later lesson additionally requires a ledger completion for the
/// lesson one order below it. A missing enrollment always fails closed.
#[derive(Clone)]
pub struct LessonGate {
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl LessonGate {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            catalog,
            enrollments,
            completions,
        }
    }

    /// Check access without distinguishing the refusal reason.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Storage` if repository access fails.
    pub async fn can_access(&self, user_id: UserId, lesson: &Lesson) -> Result<bool, GateError> {
        match self.ensure_access(user_id, lesson).await {
            Ok(()) => Ok(true),
            Err(GateError::NotAssigned | GateError::PreviousLessonIncomplete) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check access, reporting why it is refused.
    ///
    /// # Errors
    ///
    /// Returns `GateError::NotAssigned` when the user holds no enrollment in
    /// the lesson's course, `GateError::PreviousLessonIncomplete` when the
    /// predecessor has no ledger completion, and `GateError::Storage` if
    /// repository access fails.
    pub async fn ensure_access(&self, user_id: UserId, lesson: &Lesson) -> Result<(), GateError> {
        let enrollment = self
            .enrollments
            .get_enrollment(user_id, lesson.course_id)
            .await?;
        if enrollment.is_none() {
            return Err(GateError::NotAssigned);
        }
        if lesson.is_first() {
            return Ok(());
        }

        let previous = self
            .catalog
            .lesson_by_order(lesson.course_id, lesson.order - 1)
            .await?;
        let unlocked = match previous {
            Some(prev) => self.completions.completion_exists(user_id, prev.id).await?,
            // a hole in the ordering cannot be completed, so it locks
            // everything behind it
            None => false,
        };
        if unlocked {
            Ok(())
        } else {
            Err(GateError::PreviousLessonIncomplete)
        }
    }
}
