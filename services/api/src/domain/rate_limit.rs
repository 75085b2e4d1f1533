//! SMS request throttling.
//!
//! Each `(purpose, phone)` record carries an attempt counter and the time of the last
//! accepted request. The policy is a pure function so the store can apply it while holding
//! the row lock.

use chrono::{DateTime, Duration, Utc};

use crate::error::ApiError;

/// Minimum gap between two code requests for the same phone, in seconds.
pub const MINUTE_WINDOW_SECS: i64 = 60;

/// Window after which the attempt counter starts over, in seconds.
pub const DAILY_WINDOW_SECS: i64 = 24 * 60 * 60;

/// The request that would bring the counter to this value is refused.
pub const DAILY_MAX_ATTEMPTS: i32 = 3;

/// Counter state of an existing record.
#[derive(Debug, Clone, Copy)]
pub struct AttemptState {
    pub attempts: i32,
    pub updated_at: DateTime<Utc>,
}

/// Decide whether a new code request is accepted, returning the counter to persist.
///
/// Refused requests leave the stored state untouched.
pub fn next_attempt(previous: Option<AttemptState>, now: DateTime<Utc>) -> Result<i32, ApiError> {
    let Some(prev) = previous else {
        return Ok(1);
    };
    let elapsed = now - prev.updated_at;
    if elapsed >= Duration::seconds(DAILY_WINDOW_SECS) {
        return Ok(1);
    }
    if prev.attempts >= 1 && elapsed < Duration::seconds(MINUTE_WINDOW_SECS) {
        return Err(ApiError::SmsMinuteLimit);
    }
    let next = prev.attempts + 1;
    if next >= DAILY_MAX_ATTEMPTS {
        return Err(ApiError::SmsDailyLimit);
    }
    Ok(next)
}
