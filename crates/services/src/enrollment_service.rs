use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use lms_core::model::{
    AuthenticatedUser, Capability, CourseId, EnrollmentId, EnrollmentProgress, EnrollmentStatus,
    LessonId, UserId,
};
use storage::repository::{
    CatalogRepository, CompletionRepository, EnrollmentRepository, NewEnrollmentRecord,
    ProgressPersistence, StorageError,
};

use crate::Clock;
use crate::error::EnrollmentServiceError;
use crate::views::{CourseProgressView, CourseSummary, LessonProgressView};

/// Creates enrollments and serves the learner's progress dashboard.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    completions: Arc<dyn CompletionRepository>,
    progress: Arc<dyn ProgressPersistence>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        completions: Arc<dyn CompletionRepository>,
        progress: Arc<dyn ProgressPersistence>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
            completions,
            progress,
        }
    }

    /// Assign a course to another user.
    ///
    /// The enrollment starts as `Assigned` with zero progress; the deadline
    /// is derived from the course's window when it has one. Whether the
    /// target user exists is the identity collaborator's concern.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Forbidden` when the caller cannot
    /// assign courses, `CourseNotFound` for an unknown course,
    /// `AlreadyAssigned` when the target already holds an enrollment, and
    /// `Storage` if persistence fails.
    pub async fn assign(
        &self,
        caller: &AuthenticatedUser,
        target: UserId,
        course_id: CourseId,
    ) -> Result<EnrollmentId, EnrollmentServiceError> {
        if !caller.can(Capability::AssignCourses) {
            return Err(EnrollmentServiceError::Forbidden);
        }
        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or(EnrollmentServiceError::CourseNotFound)?;

        let now = self.clock.now();
        let enrollment_id = self
            .enrollments
            .insert_new_enrollment(NewEnrollmentRecord {
                user_id: target,
                course_id,
                status: EnrollmentStatus::Assigned,
                deadline_at: course.deadline_from(now),
                started_at: now,
            })
            .await
            .map_err(|e| match e {
                StorageError::Conflict => EnrollmentServiceError::AlreadyAssigned,
                other => EnrollmentServiceError::Storage(other),
            })?;
        info!(
            "course assigned user={} course={} by={}",
            target, course_id, caller.id
        );
        Ok(enrollment_id)
    }

    /// Enroll the caller in a course.
    ///
    /// Already enrolled is a success: the existing enrollment id comes back,
    /// and an untouched `Assigned` enrollment advances to `InProgress`
    /// because the learner just opened the course. A fresh enrollment
    /// requires the course to be public and starts as `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Forbidden` when the caller cannot
    /// take courses, `CourseNotFound` for an unknown course, `NotPublic`
    /// when the course is closed to self-enrollment, and `Storage` if
    /// persistence fails.
    pub async fn enroll(
        &self,
        caller: &AuthenticatedUser,
        course_id: CourseId,
    ) -> Result<EnrollmentId, EnrollmentServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(EnrollmentServiceError::Forbidden);
        }
        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or(EnrollmentServiceError::CourseNotFound)?;

        if let Some(existing) = self.enrollments.get_enrollment(caller.id, course_id).await? {
            if existing.status() == EnrollmentStatus::Assigned {
                self.enrollments.mark_started(caller.id, course_id).await?;
            }
            return Ok(existing.id());
        }

        if !course.is_public() {
            return Err(EnrollmentServiceError::NotPublic);
        }

        let now = self.clock.now();
        let record = NewEnrollmentRecord {
            user_id: caller.id,
            course_id,
            status: EnrollmentStatus::InProgress,
            deadline_at: course.deadline_from(now),
            started_at: now,
        };
        match self.enrollments.insert_new_enrollment(record).await {
            Ok(enrollment_id) => {
                info!("self-enrolled user={} course={}", caller.id, course_id);
                Ok(enrollment_id)
            }
            Err(StorageError::Conflict) => {
                // lost a race with a concurrent enroll or assign; adopt the
                // winner's enrollment
                let existing = self
                    .enrollments
                    .get_enrollment(caller.id, course_id)
                    .await?
                    .ok_or(StorageError::NotFound)?;
                Ok(existing.id())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recompute the caller's enrollment aggregate from current ledger
    /// facts.
    ///
    /// Idempotent; with an unchanged ledger the outcome is identical and no
    /// state moves.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Forbidden` when the caller cannot
    /// take courses, `NotAssigned` when the caller holds no enrollment in
    /// the course, and `Storage` if persistence fails.
    pub async fn reconcile(
        &self,
        caller: &AuthenticatedUser,
        course_id: CourseId,
    ) -> Result<EnrollmentProgress, EnrollmentServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(EnrollmentServiceError::Forbidden);
        }
        self.progress
            .reconcile(caller.id, course_id, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EnrollmentServiceError::NotAssigned,
                other => EnrollmentServiceError::Storage(other),
            })
    }

    /// The learner's dashboard: one entry per enrollment, each reconciled
    /// before it is reported so catalog edits since the last write are
    /// folded in.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Forbidden` when the caller cannot
    /// take courses and `Storage` if repository access fails.
    pub async fn my_courses(
        &self,
        caller: &AuthenticatedUser,
    ) -> Result<Vec<CourseProgressView>, EnrollmentServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(EnrollmentServiceError::Forbidden);
        }
        let now = self.clock.now();
        let enrollments = self.enrollments.enrollments_for_user(caller.id).await?;
        let completed: HashSet<LessonId> = self
            .completions
            .completed_lessons(caller.id)
            .await?
            .into_iter()
            .collect();

        let mut entries = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let course_id = enrollment.course_id();
            let reconciled = self.progress.reconcile(caller.id, course_id, now).await?;
            let course = self
                .catalog
                .get_course(course_id)
                .await?
                .ok_or(StorageError::NotFound)?;
            let lessons = self.catalog.lessons_for_course(course_id).await?;

            entries.push(CourseProgressView {
                course: CourseSummary::from_course(&course),
                status: reconciled.status,
                progress_percent: reconciled.percent,
                deadline_at: enrollment.deadline_at(),
                lessons: lessons
                    .iter()
                    .map(|l| LessonProgressView::from_lesson(l, completed.contains(&l.id)))
                    .collect(),
            });
        }
        Ok(entries)
    }
}
