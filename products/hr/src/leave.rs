use chrono::{Datelike, NaiveDate, Weekday};
use thiserror::Error;

/// Longest calendar span a single request may cover.
pub const MAX_LEAVE_SPAN_DAYS: i64 = 90;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaveError {
    #[error("end date must not be before start date")]
    EndBeforeStart,
    #[error("leave may not span more than {max} days")]
    SpanTooLong { max: i64 },
    #[error("requested range contains no working days")]
    NoWorkingDays,
}

/// Counts Monday–Friday dates in the inclusive range `start..=end`.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> Result<u32, LeaveError> {
    if end < start {
        return Err(LeaveError::EndBeforeStart);
    }
    let span = (end - start).num_days() + 1;
    if span > MAX_LEAVE_SPAN_DAYS {
        return Err(LeaveError::SpanTooLong {
            max: MAX_LEAVE_SPAN_DAYS,
        });
    }
    let days = start
        .iter_days()
        .take(span as usize)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32;
    if days == 0 {
        return Err(LeaveError::NoWorkingDays);
    }
    Ok(days)
}
