use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentStatus, Lesson, LessonId, VideoProgress, VideoRef,
};

//
// ─── COURSE VIEWS ──────────────────────────────────────────────────────────────
//

/// Course fields shared by every read model.
///
/// Presentation-agnostic: no formatted strings, no locale assumptions. The
/// collaborating frontend decides how deadlines and flags are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub is_mandatory: bool,
    pub is_public: bool,
    pub deadline_days: Option<u32>,
}

impl CourseSummary {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: course.id(),
            title: course.title().to_owned(),
            description: course.description().map(str::to_owned),
            is_mandatory: course.is_mandatory(),
            is_public: course.is_public(),
            deadline_days: course.deadline_days(),
        }
    }
}

/// The caller's enrollment state attached to a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentOverlay {
    pub status: EnrollmentStatus,
    pub progress_percent: u8,
    pub deadline_at: Option<DateTime<Utc>>,
}

impl EnrollmentOverlay {
    #[must_use]
    pub fn from_enrollment(enrollment: &Enrollment) -> Self {
        Self {
            status: enrollment.status(),
            progress_percent: enrollment.progress_percent(),
            deadline_at: enrollment.deadline_at(),
        }
    }
}

/// One catalog row: the course plus the caller's enrollment when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub course: CourseSummary,
    pub enrollment: Option<EnrollmentOverlay>,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(course: &Course, enrollment: Option<&Enrollment>) -> Self {
        Self {
            course: CourseSummary::from_course(course),
            enrollment: enrollment.map(EnrollmentOverlay::from_enrollment),
        }
    }
}

//
// ─── LESSON VIEWS ──────────────────────────────────────────────────────────────
//

/// Ordered lesson listing row; carries no per-user state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonOverview {
    pub id: LessonId,
    pub order: u32,
    pub title: String,
    pub has_video: bool,
}

impl LessonOverview {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id,
            order: lesson.order,
            title: lesson.title.clone(),
            has_video: lesson.video.is_some(),
        }
    }
}

/// Lesson row inside a progress view, with the caller's ledger flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgressView {
    pub id: LessonId,
    pub order: u32,
    pub title: String,
    pub has_video: bool,
    pub is_completed: bool,
}

impl LessonProgressView {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson, is_completed: bool) -> Self {
        Self {
            id: lesson.id,
            order: lesson.order,
            title: lesson.title.clone(),
            has_video: lesson.video.is_some(),
            is_completed,
        }
    }
}

/// Full lesson payload for a learner who passed the sequential gate.
///
/// `current_position_sec` is 0 until the first watch sample arrives, so the
/// player always has a resume point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDetail {
    pub id: LessonId,
    pub course_id: CourseId,
    pub order: u32,
    pub title: String,
    pub video_url: Option<String>,
    pub content: Option<String>,
    pub current_position_sec: u32,
    pub is_completed: bool,
}

impl LessonDetail {
    #[must_use]
    pub fn from_parts(lesson: &Lesson, watch: Option<&VideoProgress>, is_completed: bool) -> Self {
        Self {
            id: lesson.id,
            course_id: lesson.course_id,
            order: lesson.order,
            title: lesson.title.clone(),
            video_url: lesson.video.as_ref().map(VideoRef::as_str).map(str::to_owned),
            content: lesson.content.clone(),
            current_position_sec: watch.map_or(0, |w| w.position_sec),
            is_completed,
        }
    }
}

//
// ─── PROGRESS VIEWS ────────────────────────────────────────────────────────────
//

/// One entry of the learner's dashboard: the course, the reconciled
/// enrollment state, and every lesson with its ledger flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseProgressView {
    pub course: CourseSummary,
    pub status: EnrollmentStatus,
    pub progress_percent: u8,
    pub deadline_at: Option<DateTime<Utc>>,
    pub lessons: Vec<LessonProgressView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use lms_core::model::{EnrollmentId, LessonDraft, UserId, WatchEvent};
    use lms_core::time::fixed_now;

    fn course() -> Course {
        Course::new(
            CourseId::new(7),
            "Security Basics",
            Some("annual refresher".into()),
            true,
            Some(14),
            false,
            fixed_now(),
        )
        .unwrap()
    }

    fn lesson(order: u32, video: Option<&str>) -> Lesson {
        LessonDraft {
            course_id: CourseId::new(7),
            order,
            title: format!("Lesson {order}"),
            video_url: video.map(str::to_owned),
            content: None,
        }
        .validate()
        .unwrap()
        .assign_id(LessonId::new(u64::from(order)))
    }

    #[test]
    fn catalog_entry_carries_overlay_when_enrolled() {
        let course = course();
        let enrollment = Enrollment::new(
            EnrollmentId::new(1),
            UserId::new(2),
            course.id(),
            EnrollmentStatus::InProgress,
            40,
            None,
            fixed_now(),
            None,
        )
        .unwrap();

        let entry = CatalogEntry::new(&course, Some(&enrollment));
        assert_eq!(entry.course.title, "Security Basics");
        let overlay = entry.enrollment.unwrap();
        assert_eq!(overlay.status, EnrollmentStatus::InProgress);
        assert_eq!(overlay.progress_percent, 40);

        let bare = CatalogEntry::new(&course, None);
        assert!(bare.enrollment.is_none());
    }

    #[test]
    fn lesson_detail_defaults_position_to_zero() {
        let lesson = lesson(1, Some("https://videos.example.com/a.mp4"));
        let detail = LessonDetail::from_parts(&lesson, None, false);
        assert_eq!(detail.current_position_sec, 0);
        assert!(!detail.is_completed);
        assert_eq!(
            detail.video_url.as_deref(),
            Some("https://videos.example.com/a.mp4")
        );
    }

    #[test]
    fn lesson_detail_resumes_from_watch_state() {
        let lesson = lesson(2, None);
        let watch = VideoProgress::from_event(
            UserId::new(1),
            lesson.id,
            WatchEvent::new(42, 55).unwrap(),
            fixed_now(),
        );
        let detail = LessonDetail::from_parts(&lesson, Some(&watch), true);
        assert_eq!(detail.current_position_sec, 42);
        assert!(detail.is_completed);
        assert_eq!(detail.video_url, None);
    }

    #[test]
    fn views_serialize_for_the_http_layer() {
        let entry = CatalogEntry::new(&course(), None);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["course"]["id"], 7);
        assert_eq!(json["course"]["is_public"], false);
        assert!(json["enrollment"].is_null());

        let overview = LessonOverview::from_lesson(&lesson(1, None));
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["order"], 1);
        assert_eq!(json["has_video"], false);
    }
}
