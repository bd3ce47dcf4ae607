use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, EnrollmentProgress, EnrollmentStatus, Lesson,
    LessonCompletion, LessonDraft, LessonId, UserId, ValidatedLesson, VideoProgress, WatchEvent,
};
use lms_core::progress;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── INSERT RECORDS ────────────────────────────────────────────────────────────
//

/// Insert shape for a course awaiting its storage id.
#[derive(Debug, Clone)]
pub struct NewCourseRecord {
    pub title: String,
    pub description: Option<String>,
    pub is_mandatory: bool,
    pub deadline_days: Option<u32>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

impl NewCourseRecord {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title().to_owned(),
            description: course.description().map(str::to_owned),
            is_mandatory: course.is_mandatory(),
            deadline_days: course.deadline_days(),
            is_public: course.is_public(),
            created_at: course.created_at(),
        }
    }
}

/// Insert shape for a validated lesson awaiting its storage id.
#[derive(Debug, Clone)]
pub struct NewLessonRecord {
    pub course_id: CourseId,
    pub order: u32,
    pub title: String,
    pub video_url: Option<String>,
    pub content: Option<String>,
}

impl NewLessonRecord {
    #[must_use]
    pub fn from_validated(lesson: &ValidatedLesson) -> Self {
        Self {
            course_id: lesson.course_id,
            order: lesson.order,
            title: lesson.title.clone(),
            video_url: lesson.video.as_ref().map(|v| v.as_str().to_owned()),
            content: lesson.content.clone(),
        }
    }
}

/// Insert shape for a fresh enrollment. Percent always starts at 0.
#[derive(Debug, Clone)]
pub struct NewEnrollmentRecord {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    pub deadline_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for courses and their lessons.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist a new course, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn insert_new_course(&self, record: NewCourseRecord) -> Result<CourseId, StorageError>;

    /// Fetch a course by id. `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// All courses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Persist a new lesson, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the (course, order) slot is
    /// already taken.
    async fn insert_new_lesson(&self, record: NewLessonRecord) -> Result<LessonId, StorageError>;

    /// Fetch a lesson by id. `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Lessons of one course, ascending by order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// The lesson occupying a given order slot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn lesson_by_order(
        &self,
        course_id: CourseId,
        order: u32,
    ) -> Result<Option<Lesson>, StorageError>;

    /// Number of lessons in a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn lesson_count(&self, course_id: CourseId) -> Result<u32, StorageError>;
}

/// Repository contract for enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Persist a new enrollment, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the user already holds an
    /// enrollment in the course.
    async fn insert_new_enrollment(
        &self,
        record: NewEnrollmentRecord,
    ) -> Result<EnrollmentId, StorageError>;

    /// Fetch by the (user, course) unique key. `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// All enrollments of one user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn enrollments_for_user(&self, user_id: UserId)
    -> Result<Vec<Enrollment>, StorageError>;

    /// Advance an `Assigned` enrollment to `InProgress`.
    ///
    /// A no-op for any other current status, so repeated calls are safe.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when no enrollment exists for the
    /// pair.
    async fn mark_started(&self, user_id: UserId, course_id: CourseId)
    -> Result<(), StorageError>;
}

/// Repository contract for watch telemetry.
#[async_trait]
pub trait WatchRepository: Send + Sync {
    /// Upsert watch state for a (user, lesson) pair and return the stored
    /// row.
    ///
    /// Position is overwritten; the stored percent only ratchets upward.
    /// Implementations must make this one atomic conditional write, never a
    /// read-modify-write, so concurrent samples cannot lose the ratchet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn upsert_watch(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        event: WatchEvent,
        now: DateTime<Utc>,
    ) -> Result<VideoProgress, StorageError>;

    /// Fetch watch state for a pair. `Ok(None)` before the first sample.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_watch(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<VideoProgress>, StorageError>;
}

/// Repository contract for reading the completion ledger.
///
/// Ledger writes go through [`ProgressPersistence`] so they always travel
/// with a recompute.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// True when a ledger entry exists for the pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn completion_exists(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<bool, StorageError>;

    /// Every lesson the user has completed, across all courses.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn completed_lessons(&self, user_id: UserId) -> Result<Vec<LessonId>, StorageError>;

    /// Number of the user's completions within one course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn completed_count(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<u32, StorageError>;
}

/// The transactional seam of the engine: ledger mutation and aggregate
/// recompute as one all-or-nothing unit.
#[async_trait]
pub trait ProgressPersistence: Send + Sync {
    /// Toggle a ledger entry and recompute the enrollment, atomically.
    ///
    /// Marking an already-marked lesson (or unmarking an absent one) is a
    /// no-op for the ledger; the recompute still runs. The enrollment row
    /// is re-checked inside the transaction: the caller's preconditions may
    /// have raced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when no enrollment exists for the
    /// lesson's course, `StorageError::Conflict` when that enrollment is
    /// already `Completed`.
    async fn apply_completion(
        &self,
        user_id: UserId,
        lesson: &Lesson,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentProgress, StorageError>;

    /// Recompute and persist the enrollment aggregate from current ledger
    /// facts, atomically. Idempotent; safe to call from read paths.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when no enrollment exists for the
    /// pair.
    async fn reconcile(
        &self,
        user_id: UserId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentProgress, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemState {
    courses: HashMap<CourseId, Course>,
    lessons: HashMap<LessonId, Lesson>,
    enrollments: HashMap<(UserId, CourseId), Enrollment>,
    completions: HashMap<(UserId, LessonId), LessonCompletion>,
    watch: HashMap<(UserId, LessonId), VideoProgress>,
    next_course_id: u64,
    next_lesson_id: u64,
    next_enrollment_id: u64,
}

/// In-memory repository for tests and prototyping.
///
/// One mutex guards the whole state so the [`ProgressPersistence`] units are
/// atomic here exactly as they are on SQLite.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

impl MemState {
    fn recompute_for(
        &mut self,
        user_id: UserId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentProgress, StorageError> {
        let total = self
            .lessons
            .values()
            .filter(|l| l.course_id == course_id)
            .count();
        let done = self
            .completions
            .keys()
            .filter(|(uid, lid)| {
                *uid == user_id
                    && self
                        .lessons
                        .get(lid)
                        .is_some_and(|l| l.course_id == course_id)
            })
            .count();

        let total = u32::try_from(total).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let done = u32::try_from(done).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let enrollment = self
            .enrollments
            .get_mut(&(user_id, course_id))
            .ok_or(StorageError::NotFound)?;
        let outcome = progress::recompute(enrollment.status(), done, total);
        enrollment.apply_progress(outcome, now);
        Ok(outcome)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn insert_new_course(&self, record: NewCourseRecord) -> Result<CourseId, StorageError> {
        let mut state = self.lock()?;
        state.next_course_id += 1;
        let id = CourseId::new(state.next_course_id);
        let course = Course::new(
            id,
            record.title,
            record.description,
            record.is_mandatory,
            record.deadline_days,
            record.is_public,
            record.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.courses.insert(id, course);
        Ok(id)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let state = self.lock()?;
        Ok(state.courses.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let state = self.lock()?;
        let mut courses: Vec<Course> = state.courses.values().cloned().collect();
        courses.sort_by(|a, b| b.id().cmp(&a.id()));
        Ok(courses)
    }

    async fn insert_new_lesson(&self, record: NewLessonRecord) -> Result<LessonId, StorageError> {
        let mut state = self.lock()?;
        let slot_taken = state
            .lessons
            .values()
            .any(|l| l.course_id == record.course_id && l.order == record.order);
        if slot_taken {
            return Err(StorageError::Conflict);
        }

        state.next_lesson_id += 1;
        let id = LessonId::new(state.next_lesson_id);
        let lesson = LessonDraft {
            course_id: record.course_id,
            order: record.order,
            title: record.title,
            video_url: record.video_url,
            content: record.content,
        }
        .validate()
        .map_err(|e| StorageError::Serialization(e.to_string()))?
        .assign_id(id);
        state.lessons.insert(id, lesson);
        Ok(id)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let state = self.lock()?;
        Ok(state.lessons.get(&id).cloned())
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let state = self.lock()?;
        let mut lessons: Vec<Lesson> = state
            .lessons
            .values()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.order);
        Ok(lessons)
    }

    async fn lesson_by_order(
        &self,
        course_id: CourseId,
        order: u32,
    ) -> Result<Option<Lesson>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .lessons
            .values()
            .find(|l| l.course_id == course_id && l.order == order)
            .cloned())
    }

    async fn lesson_count(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let state = self.lock()?;
        let count = state
            .lessons
            .values()
            .filter(|l| l.course_id == course_id)
            .count();
        u32::try_from(count).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_new_enrollment(
        &self,
        record: NewEnrollmentRecord,
    ) -> Result<EnrollmentId, StorageError> {
        let mut state = self.lock()?;
        let key = (record.user_id, record.course_id);
        if state.enrollments.contains_key(&key) {
            return Err(StorageError::Conflict);
        }

        state.next_enrollment_id += 1;
        let id = EnrollmentId::new(state.next_enrollment_id);
        let enrollment = Enrollment::new(
            id,
            record.user_id,
            record.course_id,
            record.status,
            0,
            record.deadline_at,
            record.started_at,
            None,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.enrollments.insert(key, enrollment);
        Ok(id)
    }

    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let state = self.lock()?;
        Ok(state.enrollments.get(&(user_id, course_id)).cloned())
    }

    async fn enrollments_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let state = self.lock()?;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|e| e.user_id() == user_id)
            .cloned()
            .collect();
        enrollments.sort_by_key(Enrollment::id);
        Ok(enrollments)
    }

    async fn mark_started(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let enrollment = state
            .enrollments
            .get_mut(&(user_id, course_id))
            .ok_or(StorageError::NotFound)?;
        enrollment.mark_started();
        Ok(())
    }
}

#[async_trait]
impl WatchRepository for InMemoryRepository {
    async fn upsert_watch(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        event: WatchEvent,
        now: DateTime<Utc>,
    ) -> Result<VideoProgress, StorageError> {
        let mut state = self.lock()?;
        let entry = state
            .watch
            .entry((user_id, lesson_id))
            .and_modify(|vp| vp.absorb(event, now))
            .or_insert_with(|| VideoProgress::from_event(user_id, lesson_id, event, now));
        Ok(entry.clone())
    }

    async fn get_watch(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<VideoProgress>, StorageError> {
        let state = self.lock()?;
        Ok(state.watch.get(&(user_id, lesson_id)).cloned())
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn completion_exists(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<bool, StorageError> {
        let state = self.lock()?;
        Ok(state.completions.contains_key(&(user_id, lesson_id)))
    }

    async fn completed_lessons(&self, user_id: UserId) -> Result<Vec<LessonId>, StorageError> {
        let state = self.lock()?;
        let mut lessons: Vec<LessonId> = state
            .completions
            .keys()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, lid)| *lid)
            .collect();
        lessons.sort();
        Ok(lessons)
    }

    async fn completed_count(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<u32, StorageError> {
        let state = self.lock()?;
        let count = state
            .completions
            .iter()
            .filter(|((uid, lid), _)| {
                *uid == user_id
                    && state
                        .lessons
                        .get(lid)
                        .is_some_and(|l| l.course_id == course_id)
            })
            .count();
        u32::try_from(count).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ProgressPersistence for InMemoryRepository {
    async fn apply_completion(
        &self,
        user_id: UserId,
        lesson: &Lesson,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentProgress, StorageError> {
        let mut state = self.lock()?;

        // preconditions may have raced; re-check under the lock
        let enrollment = state
            .enrollments
            .get(&(user_id, lesson.course_id))
            .ok_or(StorageError::NotFound)?;
        if enrollment.status().is_terminal() {
            return Err(StorageError::Conflict);
        }

        let key = (user_id, lesson.id);
        if completed {
            state
                .completions
                .entry(key)
                .or_insert_with(|| LessonCompletion::new(user_id, lesson.id, now));
        } else {
            state.completions.remove(&key);
        }

        state.recompute_for(user_id, lesson.course_id, now)
    }

    async fn reconcile(
        &self,
        user_id: UserId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentProgress, StorageError> {
        let mut state = self.lock()?;
        state.recompute_for(user_id, course_id, now)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repository contracts behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub watch: Arc<dyn WatchRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub progress: Arc<dyn ProgressPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            catalog: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            watch: Arc::new(repo.clone()),
            completions: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
