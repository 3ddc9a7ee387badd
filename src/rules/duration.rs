//! Chargeable-hours arithmetic.
//!
//! Ordinary leave is charged against four fixed work blocks per weekday.
//! Weekday overtime is charged against the 18:00-22:00 evening window, while
//! weekend overtime follows the normal block structure.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::model::leave_request::LeaveType;
use crate::rules::error::{LeaveError, Result};
use crate::rules::policy::{personal_leave_hours_allowed, round_to};

/// Time-of-day window in minutes after midnight, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: u32,
    end: u32,
}

const fn hm(hour: u32, minute: u32) -> u32 {
    hour * 60 + minute
}

const WORK_BLOCKS: [Window; 4] = [
    Window { start: hm(8, 0), end: hm(10, 0) },
    Window { start: hm(10, 15), end: hm(12, 15) },
    Window { start: hm(13, 15), end: hm(15, 15) },
    Window { start: hm(15, 30), end: hm(17, 30) },
];

const OVERTIME_WINDOW: Window = Window { start: hm(18, 0), end: hm(22, 0) };

pub const OVERTIME_START_MINUTE: u32 = hm(18, 0);
pub const OVERTIME_DAILY_CAP_HOURS: f64 = 4.0;
pub const OVERTIME_MIN_HOURS: f64 = 1.0;
pub const MEAL_ALLOWANCE_MINUTE: u32 = hm(19, 30);

impl Window {
    fn on(self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let midnight = day.and_time(NaiveTime::MIN);
        (
            midnight + Duration::minutes(self.start.into()),
            midnight + Duration::minutes(self.end.into()),
        )
    }

    /// Seconds of `[start, end)` falling inside this window on `day`.
    fn overlap_seconds(self, day: NaiveDate, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        let (lo, hi) = self.on(day);
        let from = start.max(lo);
        let to = end.min(hi);
        if from < to { (to - from).num_seconds() } else { 0 }
    }
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

fn minute_of_day(ts: NaiveDateTime) -> u32 {
    ts.hour() * 60 + ts.minute()
}

fn seconds_to_hours(seconds: i64) -> f64 {
    seconds as f64 / 3600.0
}

/// Chargeable hours of `[start, end)`.
///
/// Each calendar day in the range is charged with the model that applies to
/// it: weekday overtime days use the evening window (capped at four hours,
/// one decimal), everything else uses the work blocks. Ordinary leave never
/// charges weekends. The total is rounded to two decimals.
pub fn chargeable_hours(start: NaiveDateTime, end: NaiveDateTime, is_overtime: bool) -> f64 {
    if start >= end {
        return 0.0;
    }

    let mut block_seconds = 0i64;
    let mut evening_hours = 0.0;
    let last_day = end.date();
    let mut day = start.date();

    while day <= last_day {
        let weekend = is_weekend(day);
        if is_overtime && !weekend {
            let hours = seconds_to_hours(OVERTIME_WINDOW.overlap_seconds(day, start, end));
            evening_hours += round_to(hours.min(OVERTIME_DAILY_CAP_HOURS), 1);
        } else if is_overtime || !weekend {
            block_seconds += WORK_BLOCKS
                .iter()
                .map(|block| block.overlap_seconds(day, start, end))
                .sum::<i64>();
        }

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    round_to(evening_hours + seconds_to_hours(block_seconds), 2)
}

/// Overtime ending at or after 19:30 earns a meal allowance.
pub fn meal_allowance(leave_type: LeaveType, end: NaiveDateTime) -> bool {
    leave_type.is_overtime() && minute_of_day(end) >= MEAL_ALLOWANCE_MINUTE
}

/// Category rules applied to already computed hours.
pub fn validate_hours(
    leave_type: LeaveType,
    start: NaiveDateTime,
    hours: f64,
) -> Result<()> {
    if hours <= 0.0 {
        return Err(LeaveError::InvalidDuration(
            "the requested range contains no chargeable hours".into(),
        ));
    }

    match leave_type {
        LeaveType::Overtime => validate_overtime(start, hours),
        LeaveType::Personal if !personal_leave_hours_allowed(hours) => {
            Err(LeaveError::InvalidDuration(format!(
                "personal leave must be taken in multiples of 2 hours, got {hours}"
            )))
        }
        _ => Ok(()),
    }
}

fn validate_overtime(start: NaiveDateTime, hours: f64) -> Result<()> {
    if minute_of_day(start) != OVERTIME_START_MINUTE || start.second() != 0 {
        return Err(LeaveError::InvalidDuration(
            "overtime must start at 18:00".into(),
        ));
    }
    if hours < OVERTIME_MIN_HOURS {
        return Err(LeaveError::InvalidDuration(
            "overtime must last at least until 19:00".into(),
        ));
    }
    if !is_weekend(start.date()) && hours > OVERTIME_DAILY_CAP_HOURS {
        return Err(LeaveError::InvalidDuration(
            "weekday overtime is limited to 4 hours".into(),
        ));
    }
    Ok(())
}
