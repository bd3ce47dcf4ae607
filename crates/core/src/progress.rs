use crate::model::{EnrollmentProgress, EnrollmentStatus};

//
// ─── AGGREGATE ARITHMETIC ──────────────────────────────────────────────────────
//

/// Derives the completion percent from ledger facts.
///
/// Floor division: 1 of 3 lessons is 33, never 34. A course with no lessons
/// is 0 percent regardless of ledger contents. Values are capped at 100 so a
/// stale ledger row for a deleted lesson cannot push the percent out of
/// range.
///
/// # Examples
///
/// ```
/// # use lms_core::progress::percent_complete;
/// assert_eq!(percent_complete(2, 5), 40);
/// assert_eq!(percent_complete(1, 3), 33);
/// assert_eq!(percent_complete(0, 0), 0);
/// ```
#[must_use]
pub fn percent_complete(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (u64::from(done) * 100) / u64::from(total);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// Applies the forward-only status transition for a freshly derived percent.
///
/// - 100 percent moves any non-terminal status to `Completed`.
/// - A positive percent moves `Assigned` to `InProgress`.
/// - Everything else keeps the current status; in particular a percent
///   dropping back to 0 (ledger entry unmarked) leaves `InProgress` alone,
///   and `Completed` never regresses.
#[must_use]
pub fn next_status(current: EnrollmentStatus, percent: u8) -> EnrollmentStatus {
    if percent >= 100 {
        return EnrollmentStatus::Completed;
    }
    if percent > 0 && current == EnrollmentStatus::Assigned {
        return EnrollmentStatus::InProgress;
    }
    current
}

/// Full recompute step: ledger counts in, enrollment percent/status out.
///
/// Pure and idempotent; both storage backends call this inside the same
/// transaction as the ledger mutation so the persisted aggregate can never
/// drift from the ledger.
///
/// # Examples
///
/// ```
/// # use lms_core::progress::recompute;
/// # use lms_core::model::EnrollmentStatus;
/// let p = recompute(EnrollmentStatus::Assigned, 1, 3);
/// assert_eq!(p.percent, 33);
/// assert_eq!(p.status, EnrollmentStatus::InProgress);
/// ```
#[must_use]
pub fn recompute(current: EnrollmentStatus, done: u32, total: u32) -> EnrollmentProgress {
    let percent = percent_complete(done, total);
    let status = next_status(current, percent);
    // terminal state always reads 100, even when the raw ratio is below it
    let percent = if status == EnrollmentStatus::Completed {
        100
    } else {
        percent
    };
    EnrollmentProgress { percent, status }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
