use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::ids::CourseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course title exceeds {MAX_TITLE_LEN} characters")]
    TitleTooLong,

    #[error("deadline days must be > 0 when set")]
    InvalidDeadlineDays,
}

/// Upper bound on course title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// An ordered collection of lessons a user can be enrolled in.
///
/// Mandatory courses are assigned by an operator; public courses can be
/// self-enrolled. `deadline_days` is the per-enrollment completion window,
/// applied when an enrollment is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    is_mandatory: bool,
    deadline_days: Option<u32>,
    is_public: bool,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a new Course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is empty or
    /// whitespace-only, `CourseError::TitleTooLong` past the length cap,
    /// and `CourseError::InvalidDeadlineDays` for a zero deadline window.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        is_mandatory: bool,
        deadline_days: Option<u32>,
        is_public: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CourseError::TitleTooLong);
        }
        if deadline_days == Some(0) {
            return Err(CourseError::InvalidDeadlineDays);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title: title.to_owned(),
            description,
            is_mandatory,
            deadline_days,
            is_public,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.is_mandatory
    }

    #[must_use]
    pub fn deadline_days(&self) -> Option<u32> {
        self.deadline_days
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Completion deadline for an enrollment created at `enrolled_at`.
    ///
    /// `None` when the course carries no deadline window.
    #[must_use]
    pub fn deadline_from(&self, enrolled_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.deadline_days
            .map(|days| enrolled_at + Duration::days(i64::from(days)))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
