use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use lms_core::model::{
    AuthenticatedUser, Capability, Course, CourseId, Enrollment, LessonDraft, LessonId, Role,
};
use storage::repository::{
    CatalogRepository, EnrollmentRepository, NewCourseRecord, NewLessonRecord, StorageError,
};

use crate::Clock;
use crate::error::CatalogServiceError;
use crate::views::{CatalogEntry, LessonOverview};

/// Course authoring and the browsable catalog.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
        }
    }

    /// Create a course and persist it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` when the caller cannot
    /// manage courses, `Course` for validation failures, and `Storage` if
    /// persistence fails.
    pub async fn create_course(
        &self,
        caller: &AuthenticatedUser,
        title: String,
        description: Option<String>,
        is_mandatory: bool,
        deadline_days: Option<u32>,
        is_public: bool,
    ) -> Result<CourseId, CatalogServiceError> {
        if !caller.can(Capability::ManageCourses) {
            return Err(CatalogServiceError::Forbidden);
        }
        let now = self.clock.now();
        let course = Course::new(
            CourseId::new(1),
            title,
            description,
            is_mandatory,
            deadline_days,
            is_public,
            now,
        )?;
        let course_id = self
            .catalog
            .insert_new_course(NewCourseRecord::from_course(&course))
            .await?;
        info!(
            "course created id={} title={:?} by={}",
            course_id,
            course.title(),
            caller.id
        );
        Ok(course_id)
    }

    /// Validate a lesson draft and append it to its course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` when the caller cannot
    /// manage courses, `CourseNotFound` for an unknown course, `Lesson` for
    /// validation failures, `DuplicateOrder` when the (course, order) slot
    /// is taken, and `Storage` if persistence fails.
    pub async fn add_lesson(
        &self,
        caller: &AuthenticatedUser,
        draft: LessonDraft,
    ) -> Result<LessonId, CatalogServiceError> {
        if !caller.can(Capability::ManageCourses) {
            return Err(CatalogServiceError::Forbidden);
        }
        let course_id = draft.course_id;
        self.catalog
            .get_course(course_id)
            .await?
            .ok_or(CatalogServiceError::CourseNotFound)?;

        let validated = draft.validate()?;
        let order = validated.order;
        let lesson_id = self
            .catalog
            .insert_new_lesson(NewLessonRecord::from_validated(&validated))
            .await
            .map_err(|e| match e {
                StorageError::Conflict => CatalogServiceError::DuplicateOrder,
                other => CatalogServiceError::Storage(other),
            })?;
        info!(
            "lesson added course={} order={} id={}",
            course_id, order, lesson_id
        );
        Ok(lesson_id)
    }

    /// The catalog as the caller sees it, newest course first.
    ///
    /// Admins see every course; everyone else sees public courses plus the
    /// ones they are enrolled in. Each entry carries the caller's enrollment
    /// overlay when one exists.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` when the caller cannot take
    /// courses and `Storage` if repository access fails.
    pub async fn catalog(
        &self,
        caller: &AuthenticatedUser,
    ) -> Result<Vec<CatalogEntry>, CatalogServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(CatalogServiceError::Forbidden);
        }
        let courses = self.catalog.list_courses().await?;
        let enrollments: HashMap<CourseId, Enrollment> = self
            .enrollments
            .enrollments_for_user(caller.id)
            .await?
            .into_iter()
            .map(|e| (e.course_id(), e))
            .collect();

        let entries = courses
            .iter()
            .filter(|course| {
                caller.role == Role::Admin
                    || course.is_public()
                    || enrollments.contains_key(&course.id())
            })
            .map(|course| CatalogEntry::new(course, enrollments.get(&course.id())))
            .collect();
        Ok(entries)
    }

    /// Ordered lesson listing for one course.
    ///
    /// Listing shows structure only (titles, video flags); lesson content
    /// stays behind the sequential gate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` when the caller cannot take
    /// courses, `CourseNotFound` for an unknown course, and `Storage` if
    /// repository access fails.
    pub async fn course_lessons(
        &self,
        caller: &AuthenticatedUser,
        course_id: CourseId,
    ) -> Result<Vec<LessonOverview>, CatalogServiceError> {
        if !caller.can(Capability::TakeCourses) {
            return Err(CatalogServiceError::Forbidden);
        }
        self.catalog
            .get_course(course_id)
            .await?
            .ok_or(CatalogServiceError::CourseNotFound)?;

        let lessons = self.catalog.lessons_for_course(course_id).await?;
        Ok(lessons.iter().map(LessonOverview::from_lesson).collect())
    }
}
