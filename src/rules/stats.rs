use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveType, RequestStatus};
use crate::rules::duration::chargeable_hours;
use crate::rules::policy::round_to;

/// Hours taken by one employee during a calendar year, per leave type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct EmployeeHours {
    pub employee_id: u64,
    pub full_name: String,
    pub department: String,
    pub year: i32,
    pub annual: f64,
    pub personal: f64,
    pub sick: f64,
    pub business: f64,
    pub overtime: f64,
}

impl EmployeeHours {
    fn add(&mut self, leave_type: LeaveType, hours: f64) {
        let slot = match leave_type {
            LeaveType::Annual => &mut self.annual,
            LeaveType::Personal => &mut self.personal,
            LeaveType::Sick => &mut self.sick,
            LeaveType::Business => &mut self.business,
            LeaveType::Overtime => &mut self.overtime,
        };
        *slot = round_to(*slot + hours, 2);
    }
}

/// Hours a request contributes to the report: overtime uses the figure
/// cached at submission, everything else standard chargeable hours.
fn reported_hours(request: &LeaveRequest) -> f64 {
    if request.is_overtime() {
        request.overtime_hours.unwrap_or(0.0)
    } else {
        chargeable_hours(request.start_time, request.end_time, false)
    }
}

/// Per-employee totals for requests starting in `year` that still hold time.
pub fn yearly_hours(
    employees: &[Employee],
    requests: &[LeaveRequest],
    year: i32,
) -> Vec<EmployeeHours> {
    employees
        .iter()
        .map(|emp| {
            let mut row = EmployeeHours {
                employee_id: emp.id,
                full_name: emp.full_name.clone(),
                department: emp.department.clone(),
                year,
                ..Default::default()
            };
            requests
                .iter()
                .filter(|r| {
                    r.employee_id == emp.id
                        && r.start_time.year() == year
                        && r.status.holds_quota()
                })
                .for_each(|r| row.add(r.leave_type, reported_hours(r)));
            row
        })
        .collect()
}

/// Approved overtime reviewers are warned about going past in one month.
pub const MONTHLY_OVERTIME_WARNING_HOURS: f64 = 40.0;

/// Approved overtime hours of `employee_id` in the calendar month of `month_of`.
pub fn monthly_overtime_hours(
    requests: &[LeaveRequest],
    employee_id: u64,
    month_of: NaiveDateTime,
) -> f64 {
    let total = requests
        .iter()
        .filter(|r| {
            r.employee_id == employee_id
                && r.is_overtime()
                && r.status == RequestStatus::Approved
                && r.start_time.year() == month_of.year()
                && r.start_time.month() == month_of.month()
        })
        .map(|r| r.overtime_hours.unwrap_or(0.0))
        .sum();
    round_to(total, 2)
}
