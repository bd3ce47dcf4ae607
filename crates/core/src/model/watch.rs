use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{LessonId, UserId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("watched percent must be in 0..=100, got {0}")]
    InvalidPercent(u8),
}

//
// ─── WATCH EVENT ──────────────────────────────────────────────────────────────
//

/// A validated watch-telemetry sample from the player.
///
/// Construction is the validation boundary: an event that exists is in
/// range, so persistence never re-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchEvent {
    position_sec: u32,
    watched_percent: u8,
}

impl WatchEvent {
    /// Creates a watch event.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::InvalidPercent` when the percent exceeds 100.
    pub fn new(position_sec: u32, watched_percent: u8) -> Result<Self, WatchError> {
        if watched_percent > 100 {
            return Err(WatchError::InvalidPercent(watched_percent));
        }
        Ok(Self {
            position_sec,
            watched_percent,
        })
    }

    #[must_use]
    pub fn position_sec(&self) -> u32 {
        self.position_sec
    }

    #[must_use]
    pub fn watched_percent(&self) -> u8 {
        self.watched_percent
    }
}

//
// ─── VIDEO PROGRESS ───────────────────────────────────────────────────────────
//

/// Stored watch state for one (user, lesson) pair.
///
/// `position_sec` tracks wherever the player last was; `watched_percent`
/// only ratchets upward, so a rewind never reduces credited watch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoProgress {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub position_sec: u32,
    pub watched_percent: u8,
    pub updated_at: DateTime<Utc>,
}

impl VideoProgress {
    /// First sample for a pair: stored exactly as reported.
    #[must_use]
    pub fn from_event(
        user_id: UserId,
        lesson_id: LessonId,
        event: WatchEvent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            position_sec: event.position_sec(),
            watched_percent: event.watched_percent(),
            updated_at: now,
        }
    }

    /// Folds a later sample into the stored state: position is overwritten,
    /// percent takes the maximum of stored and incoming.
    pub fn absorb(&mut self, event: WatchEvent, now: DateTime<Utc>) {
        self.position_sec = event.position_sec();
        self.watched_percent = self.watched_percent.max(event.watched_percent());
        self.updated_at = now;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
