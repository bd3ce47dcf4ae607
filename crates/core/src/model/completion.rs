use chrono::{DateTime, Utc};

use crate::model::ids::{LessonId, UserId};

/// One ledger entry: the user has completed the lesson.
///
/// Uniqueness per (user, lesson) is a storage invariant; the ledger holds
/// at most one entry per pair, and unmarking removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCompletion {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

impl LessonCompletion {
    #[must_use]
    pub fn new(user_id: UserId, lesson_id: LessonId, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lesson_id,
            completed_at,
        }
    }
}
