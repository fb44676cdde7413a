//! Interview timer. Remaining time is always derived from the persisted start
//! timestamp; no countdown state is kept anywhere on the server.

use chrono::{DateTime, Utc};

/// Seconds left on the clock, clamped to `[0, time_limit_minutes * 60]`.
///
/// `None` when the quiz is untimed or the interview has not started yet.
pub fn remaining_seconds(
    started_at: Option<DateTime<Utc>>,
    time_limit_minutes: Option<u32>,
    now: DateTime<Utc>,
) -> Option<u64> {
    let limit = time_limit_minutes?;
    let started_at = started_at?;

    let total = i64::from(limit) * 60;
    let elapsed = (now - started_at).num_milliseconds().div_euclid(1000);
    let remaining = (total - elapsed).clamp(0, total);
    Some(remaining as u64)
}

/// True once a timed, started interview has no time left.
pub fn is_expired(
    started_at: Option<DateTime<Utc>>,
    time_limit_minutes: Option<u32>,
    now: DateTime<Utc>,
) -> bool {
    remaining_seconds(started_at, time_limit_minutes, now) == Some(0)
}
