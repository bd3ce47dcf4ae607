use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, EnrollmentId, UserId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("progress percent must be in 0..=100, got {0}")]
    InvalidPercent(u8),

    #[error("unknown enrollment status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ───────────────────────────────────────────────────────────────────
//

/// Lifecycle state of an enrollment.
///
/// The state only moves forward: Assigned → InProgress → Completed. A
/// completed enrollment is immutable; nothing regresses it automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    Assigned,
    InProgress,
    Completed,
}

impl EnrollmentStatus {
    /// Canonical string form, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Assigned => "ASSIGNED",
            EnrollmentStatus::InProgress => "IN_PROGRESS",
            EnrollmentStatus::Completed => "COMPLETED",
        }
    }

    /// Parses the canonical string form.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::UnknownStatus` for any other input.
    pub fn parse(value: &str) -> Result<Self, EnrollmentError> {
        match value {
            "ASSIGNED" => Ok(EnrollmentStatus::Assigned),
            "IN_PROGRESS" => Ok(EnrollmentStatus::InProgress),
            "COMPLETED" => Ok(EnrollmentStatus::Completed),
            other => Err(EnrollmentError::UnknownStatus(other.to_string())),
        }
    }

    /// True once the enrollment has reached its terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, EnrollmentStatus::Completed)
    }
}

//
// ─── PROGRESS OUTCOME ─────────────────────────────────────────────────────────
//

/// Result of an aggregator recompute: the percent and status an enrollment
/// should carry given the current ledger facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentProgress {
    pub percent: u8,
    pub status: EnrollmentStatus,
}

//
// ─── ENROLLMENT ───────────────────────────────────────────────────────────────
//

/// Links a user to a course and carries the derived completion state.
///
/// `progress_percent` and `status` are never edited directly; the aggregator
/// recomputes them from the completion ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    id: EnrollmentId,
    user_id: UserId,
    course_id: CourseId,
    status: EnrollmentStatus,
    progress_percent: u8,
    deadline_at: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Creates an enrollment from its stored parts.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidPercent` when the percent is out of
    /// range.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EnrollmentId,
        user_id: UserId,
        course_id: CourseId,
        status: EnrollmentStatus,
        progress_percent: u8,
        deadline_at: Option<DateTime<Utc>>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EnrollmentError> {
        if progress_percent > 100 {
            return Err(EnrollmentError::InvalidPercent(progress_percent));
        }

        Ok(Self {
            id,
            user_id,
            course_id,
            status,
            progress_percent,
            deadline_at,
            started_at,
            completed_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    #[must_use]
    pub fn deadline_at(&self) -> Option<DateTime<Utc>> {
        self.deadline_at
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Applies a recompute outcome, stamping `completed_at` on the edge
    /// into the terminal state.
    ///
    /// A repeated application with the same outcome changes nothing.
    pub fn apply_progress(&mut self, progress: EnrollmentProgress, now: DateTime<Utc>) {
        self.progress_percent = progress.percent;
        if progress.status.is_terminal() && !self.status.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = progress.status;
    }

    /// Marks an assigned enrollment as opened by the learner.
    ///
    /// No effect on `InProgress` or `Completed`.
    pub fn mark_started(&mut self) {
        if self.status == EnrollmentStatus::Assigned {
            self.status = EnrollmentStatus::InProgress;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
