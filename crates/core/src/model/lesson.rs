use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson order must be >= 1")]
    InvalidOrder,

    #[error("video reference is not a valid absolute URL")]
    InvalidVideoUrl,
}

//
// ─── VIDEO REFERENCE ───────────────────────────────────────────────────────────
//

/// Parsed reference to a lesson's video asset.
///
/// Only absolute URLs are accepted; relative paths would be meaningless to
/// the player the collaborating frontend hands them to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef(Url);

impl VideoRef {
    /// Parses and validates a video URL.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::InvalidVideoUrl` when the input is empty or
    /// fails URL parsing.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, LessonError> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return Err(LessonError::InvalidVideoUrl);
        }
        let url = Url::parse(s).map_err(|_| LessonError::InvalidVideoUrl)?;
        Ok(Self(url))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.0
    }
}

//
// ─── LESSON TYPES ──────────────────────────────────────────────────────────────
//

/// Authoring input for a lesson, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub course_id: CourseId,
    pub order: u32,
    pub title: String,
    pub video_url: Option<String>,
    pub content: Option<String>,
}

impl LessonDraft {
    /// Validates the draft into a lesson awaiting its storage id.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::InvalidOrder` for order 0, `EmptyTitle` for a
    /// blank title, and `InvalidVideoUrl` if the video reference does not
    /// parse.
    pub fn validate(self) -> Result<ValidatedLesson, LessonError> {
        if self.order == 0 {
            return Err(LessonError::InvalidOrder);
        }

        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }

        let video = self.video_url.map(VideoRef::parse).transpose()?;

        let content = self
            .content
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(ValidatedLesson {
            course_id: self.course_id,
            order: self.order,
            title,
            video,
            content,
        })
    }
}

/// A validated lesson that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLesson {
    pub course_id: CourseId,
    pub order: u32,
    pub title: String,
    pub video: Option<VideoRef>,
    pub content: Option<String>,
}

impl ValidatedLesson {
    #[must_use]
    pub fn assign_id(self, id: LessonId) -> Lesson {
        Lesson {
            id,
            course_id: self.course_id,
            order: self.order,
            title: self.title,
            video: self.video,
            content: self.content,
        }
    }
}

/// One unit of course content, positioned by `order` within its course.
///
/// `order` starts at 1 and is unique per course; sequential access control
/// keys off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub id: LessonId,
    pub course_id: CourseId,
    pub order: u32,
    pub title: String,
    pub video: Option<VideoRef>,
    pub content: Option<String>,
}

impl Lesson {
    /// True for the first lesson of a course, which has no predecessor to
    /// complete.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.order == 1
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(order: u32, title: &str, video_url: Option<&str>) -> LessonDraft {
        LessonDraft {
            course_id: CourseId::new(1),
            order,
            title: title.to_string(),
            video_url: video_url.map(str::to_string),
            content: None,
        }
    }

    #[test]
    fn draft_rejects_zero_order() {
        let err = draft(0, "Intro", None).validate().unwrap_err();
        assert_eq!(err, LessonError::InvalidOrder);
    }

    #[test]
    fn draft_rejects_blank_title() {
        let err = draft(1, "   ", None).validate().unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }

    #[test]
    fn draft_rejects_malformed_video_url() {
        let err = draft(1, "Intro", Some("not a url"))
            .validate()
            .unwrap_err();
        assert_eq!(err, LessonError::InvalidVideoUrl);
    }

    #[test]
    fn draft_validates_and_assigns_id() {
        let lesson = draft(2, "  Branching  ", Some("https://videos.example.com/branching.mp4"))
            .validate()
            .unwrap()
            .assign_id(LessonId::new(7));

        assert_eq!(lesson.id, LessonId::new(7));
        assert_eq!(lesson.order, 2);
        assert_eq!(lesson.title, "Branching");
        assert_eq!(
            lesson.video.as_ref().map(VideoRef::as_str),
            Some("https://videos.example.com/branching.mp4")
        );
        assert!(!lesson.is_first());
    }

    #[test]
    fn draft_filters_blank_content() {
        let mut d = draft(1, "Intro", None);
        d.content = Some("   ".into());
        let lesson = d.validate().unwrap().assign_id(LessonId::new(1));
        assert_eq!(lesson.content, None);
    }

    #[test]
    fn first_lesson_detection() {
        let lesson = draft(1, "Intro", None).validate().unwrap().assign_id(LessonId::new(3));
        assert!(lesson.is_first());
    }

    #[test]
    fn video_ref_rejects_relative_url() {
        assert!(VideoRef::parse("/media/clip.mp4").is_err());
        assert!(VideoRef::parse("").is_err());
        assert!(VideoRef::parse("https://cdn.example.com/clip.mp4").is_ok());
    }
}
