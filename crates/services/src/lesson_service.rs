use std::sync::Arc;

use lms_core::model::{AuthenticatedUser, Capability, LessonId};
use storage::repository::{CatalogRepository, CompletionRepository, WatchRepository};

use crate::error::LessonServiceError;
use crate::gate::LessonGate;
use crate::views::LessonDetail;

/// Serves lesson content to learners who pass the sequential gate.
#[derive(Clone)]
pub struct LessonService {
    gate: LessonGate,
    catalog: Arc<dyn CatalogRepository>,
    watch: Arc<dyn WatchRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        gate: LessonGate,
        catalog: Arc<dyn CatalogRepository>,
        watch: Arc<dyn WatchRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            gate,
            catalog,
            watch,
            completions,
        }
    }

    /// Full lesson payload plus the caller's resume point and ledger flag.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Forbidden` when the caller cannot take
    /// courses, `LessonNotFound` for an unknown lesson, `Gate` when the
    /// sequential gate refuses access, and `Storage` if repository access
    /// fails.
    pub async fn lesson_detail(
        &self,
        caller: &AuthenticatedUser,
        lesson_id: LessonId,
    ) -> Result<LessonDetail, LessonServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(LessonServiceError::Forbidden);
        }
        let lesson = self
            .catalog
            .get_lesson(lesson_id)
            .await?
            .ok_or(LessonServiceError::LessonNotFound)?;
        self.gate.ensure_access(caller.id, &lesson).await?;

        let watch = self.watch.get_watch(caller.id, lesson_id).await?;
        let is_completed = self
            .completions
            .completion_exists(caller.id, lesson_id)
            .await?;
        Ok(LessonDetail::from_parts(&lesson, watch.as_ref(), is_completed))
    }
}
