use std::sync::Arc;

use tracing::debug;

use lms_core::model::{AuthenticatedUser, Capability, LessonId, VideoProgress, WatchEvent};
use storage::repository::{CatalogRepository, EnrollmentRepository, WatchRepository};

use crate::Clock;
use crate::error::VideoServiceError;

/// Records watch telemetry for enrolled learners.
///
/// The sequential lesson gate is deliberately not consulted here: telemetry
/// arrives for lessons the player already opened, and dropping it because a
/// completion row is missing would lose real watch time.
#[derive(Clone)]
pub struct VideoService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    watch: Arc<dyn WatchRepository>,
}

impl VideoService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        watch: Arc<dyn WatchRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
            watch,
        }
    }

    /// Record one watch sample and return the stored row after the write.
    ///
    /// Position is overwritten so seeking backwards is reflected; the
    /// watched percent only ever ratchets upward. The upsert is a single
    /// conditional statement, so concurrent samples cannot lose the ratchet.
    ///
    /// # Errors
    ///
    /// Returns `VideoServiceError::Forbidden` when the caller cannot take
    /// courses, `Watch` when the percent is out of range, `LessonNotFound`
    /// for an unknown lesson, `NotAssigned` when the caller holds no
    /// enrollment in the lesson's course, and `Storage` if persistence
    /// fails.
    pub async fn record_progress(
        &self,
        caller: &AuthenticatedUser,
        lesson_id: LessonId,
        position_sec: u32,
        watched_percent: u8,
    ) -> Result<VideoProgress, VideoServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(VideoServiceError::Forbidden);
        }
        let event = WatchEvent::new(position_sec, watched_percent)?;

        let lesson = self
            .catalog
            .get_lesson(lesson_id)
            .await?
            .ok_or(VideoServiceError::LessonNotFound)?;
        let enrollment = self
            .enrollments
            .get_enrollment(caller.id, lesson.course_id)
            .await?;
        if enrollment.is_none() {
            return Err(VideoServiceError::NotAssigned);
        }

        let stored = self
            .watch
            .upsert_watch(caller.id, lesson_id, event, self.clock.now())
            .await?;
        debug!(
            "watch sample user={} lesson={} position={}s percent={}",
            caller.id, lesson_id, stored.position_sec, stored.watched_percent
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lms_core::model::{EnrollmentStatus, Role, UserId, WatchError};
    use lms_core::time::fixed_now;
    use storage::repository::{
        CatalogRepository as _, InMemoryRepository, NewCourseRecord, NewEnrollmentRecord,
        NewLessonRecord,
    };

    fn service(repo: &InMemoryRepository) -> VideoService {
        VideoService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn learner(id: u64) -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(id), Role::Employee)
    }

    async fn seed_lesson(repo: &InMemoryRepository, enroll_user: Option<UserId>) -> LessonId {
        let course_id = repo
            .insert_new_course(NewCourseRecord {
                title: "Course".into(),
                description: None,
                is_mandatory: false,
                deadline_days: None,
                is_public: true,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let lesson_id = repo
            .insert_new_lesson(NewLessonRecord {
                course_id,
                order: 1,
                title: "Intro".into(),
                video_url: Some("https://videos.example.com/intro.mp4".into()),
                content: None,
            })
            .await
            .unwrap();
        if let Some(user_id) = enroll_user {
            repo.insert_new_enrollment(NewEnrollmentRecord {
                user_id,
                course_id,
                status: EnrollmentStatus::Assigned,
                deadline_at: None,
                started_at: fixed_now(),
            })
            .await
            .unwrap();
        }
        lesson_id
    }

    #[tokio::test]
    async fn first_sample_is_stored_verbatim() {
        let repo = InMemoryRepository::new();
        let caller = learner(1);
        let lesson_id = seed_lesson(&repo, Some(caller.id)).await;

        let stored = service(&repo)
            .record_progress(&caller, lesson_id, 42, 55)
            .await
            .unwrap();
        assert_eq!(stored.position_sec, 42);
        assert_eq!(stored.watched_percent, 55);
        assert_eq!(stored.updated_at, fixed_now());
    }

    #[tokio::test]
    async fn rewind_keeps_the_ratchet() {
        let repo = InMemoryRepository::new();
        let caller = learner(1);
        let lesson_id = seed_lesson(&repo, Some(caller.id)).await;
        let service = service(&repo);

        service
            .record_progress(&caller, lesson_id, 300, 60)
            .await
            .unwrap();
        let stored = service
            .record_progress(&caller, lesson_id, 10, 30)
            .await
            .unwrap();

        assert_eq!(stored.position_sec, 10);
        assert_eq!(stored.watched_percent, 60);
    }

    #[tokio::test]
    async fn out_of_range_percent_is_rejected_before_any_lookup() {
        let repo = InMemoryRepository::new();
        let caller = learner(1);

        let err = service(&repo)
            .record_progress(&caller, LessonId::new(99), 0, 101)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VideoServiceError::Watch(WatchError::InvalidPercent(101))
        ));
    }

    #[tokio::test]
    async fn unknown_lesson_is_not_found() {
        let repo = InMemoryRepository::new();
        let caller = learner(1);

        let err = service(&repo)
            .record_progress(&caller, LessonId::new(99), 0, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, VideoServiceError::LessonNotFound));
    }

    #[tokio::test]
    async fn unenrolled_caller_is_not_assigned() {
        let repo = InMemoryRepository::new();
        let caller = learner(1);
        let lesson_id = seed_lesson(&repo, None).await;

        let err = service(&repo)
            .record_progress(&caller, lesson_id, 5, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, VideoServiceError::NotAssigned));
    }
}
