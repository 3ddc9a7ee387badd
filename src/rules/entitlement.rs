//! Leave-year windows, tenure-based annual entitlement and quota usage.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveType};
use crate::rules::duration::chargeable_hours;
use crate::rules::error::{LeaveError, Result};
use crate::rules::policy::{LeavePolicy, hours_to_days, round_to};

pub const MAX_ANNUAL_DAYS: u32 = 30;

/// Half-open leave-year window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CycleRange {
    #[schema(value_type = String, example = "2025-04-01T00:00:00")]
    pub start: NaiveDateTime,
    #[schema(value_type = String, example = "2026-04-01T00:00:00")]
    pub end: NaiveDateTime,
}

impl CycleRange {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuotaSummary {
    pub leave_type: LeaveType,
    /// Entitled days in the current cycle.
    pub total: f64,
    /// Days reserved by pending and approved requests.
    pub used: f64,
    pub remaining: f64,
    pub cycle: CycleRange,
}

/// Hire-date anniversary in `year`. A 29 February hire date falls on
/// 1 March in common years.
fn anniversary(hire_date: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, hire_date.month(), hire_date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(hire_date)
}

/// The leave year containing `today`.
///
/// Anchored on the most recent hire-date anniversary; employees without a
/// hire date fall back to the calendar year.
pub fn cycle_range(hire_date: Option<NaiveDate>, today: NaiveDate) -> CycleRange {
    match hire_date {
        Some(hire_date) => {
            let mut start = anniversary(hire_date, today.year());
            if today < start {
                start = anniversary(hire_date, today.year() - 1);
            }
            let end = anniversary(hire_date, start.year() + 1);
            CycleRange {
                start: start.and_time(NaiveTime::MIN),
                end: end.and_time(NaiveTime::MIN),
            }
        }
        None => {
            let year_start = today.with_ordinal(1).unwrap_or(today);
            let next_year = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(today);
            CycleRange {
                start: year_start.and_time(NaiveTime::MIN),
                end: next_year.and_time(NaiveTime::MIN) - Duration::seconds(1),
            }
        }
    }
}

pub fn years_of_service(hire_date: NaiveDate, today: NaiveDate) -> f64 {
    (today - hire_date).num_days() as f64 / 365.25
}

/// Statutory annual-leave days for the given tenure.
pub fn annual_entitlement_days(hire_date: NaiveDate, today: NaiveDate) -> u32 {
    let years = years_of_service(hire_date, today);
    let days = if years < 0.5 {
        0
    } else if years < 1.0 {
        3
    } else if years < 2.0 {
        7
    } else if years < 3.0 {
        10
    } else if years < 5.0 {
        14
    } else if years < 10.0 {
        15
    } else {
        15 + (years - 10.0).floor() as u32
    };
    days.min(MAX_ANNUAL_DAYS)
}

/// Entitled days for a quota-bearing leave type; zero for the others.
pub fn total_days(
    employee: &Employee,
    leave_type: LeaveType,
    policy: &LeavePolicy,
    today: NaiveDate,
) -> f64 {
    match leave_type {
        LeaveType::Annual => employee.annual_leave_quota.unwrap_or_else(|| {
            employee
                .hire_date
                .map(|hire_date| annual_entitlement_days(hire_date, today) as f64)
                .unwrap_or(0.0)
        }),
        LeaveType::Sick => employee
            .sick_leave_quota
            .unwrap_or(policy.default_sick_quota_days),
        LeaveType::Personal => employee
            .personal_leave_quota
            .unwrap_or(policy.default_personal_quota_days),
        LeaveType::Business | LeaveType::Overtime => 0.0,
    }
}

/// Chargeable hours reserved by the employee's requests of `leave_type`
/// starting inside `cycle`.
pub fn used_hours(
    requests: &[LeaveRequest],
    employee_id: u64,
    leave_type: LeaveType,
    cycle: &CycleRange,
) -> f64 {
    requests
        .iter()
        .filter(|r| {
            r.employee_id == employee_id
                && r.leave_type == leave_type
                && !r.is_overtime()
                && r.status.holds_quota()
                && cycle.contains(r.start_time)
        })
        .map(|r| chargeable_hours(r.start_time, r.end_time, false))
        .sum()
}

pub fn quota_summary(
    employee: &Employee,
    leave_type: LeaveType,
    requests: &[LeaveRequest],
    policy: &LeavePolicy,
    today: NaiveDate,
) -> QuotaSummary {
    let cycle = cycle_range(employee.hire_date, today);
    let total = total_days(employee, leave_type, policy, today);
    let used = round_to(
        hours_to_days(used_hours(requests, employee.id, leave_type, &cycle)),
        2,
    );
    QuotaSummary {
        leave_type,
        total,
        used,
        remaining: round_to((total - used).max(0.0), 2),
        cycle,
    }
}

/// Rejects a request whose day count exceeds what is left of the quota.
pub fn ensure_quota(summary: &QuotaSummary, requested_hours: f64) -> Result<()> {
    let requested = hours_to_days(requested_hours);
    if requested > summary.remaining {
        return Err(LeaveError::QuotaExceeded {
            remaining: summary.remaining,
            requested,
        });
    }
    Ok(())
}
