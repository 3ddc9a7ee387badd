use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::{grade::Grade, role::Role};

/// Real-time presence shown on the status dashboard.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeStatus {
    InOffice,
    Meeting,
    Out,
    Abroad,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "full_name": "王小明",
        "department": "業務部",
        "job_title": "業務專員",
        "grade": "ic",
        "role": "employee",
        "hire_date": "2019-04-01",
        "annual_leave_quota": null,
        "sick_leave_quota": 30.0,
        "personal_leave_quota": 14.0,
        "current_status": "in_office",
        "location_detail": null,
        "expected_return": null
    })
)]
pub struct Employee {
    pub id: u64,
    pub full_name: String,
    pub department: String,
    pub job_title: Option<String>,
    pub grade: Grade,
    pub role: Role,

    #[schema(example = "2019-04-01", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,

    /// Admin override of the tenure-based annual entitlement, in days.
    pub annual_leave_quota: Option<f64>,
    pub sick_leave_quota: Option<f64>,
    pub personal_leave_quota: Option<f64>,

    pub current_status: EmployeeStatus,
    pub location_detail: Option<String>,
    #[schema(value_type = Option<String>)]
    pub expected_return: Option<NaiveDateTime>,
}

impl Employee {
    /// General managers and admins sit at the top of every approval chain.
    pub fn is_general_manager(&self) -> bool {
        self.grade == Grade::GeneralManager || self.role == Role::Admin
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn same_department(&self, other: &Employee) -> bool {
        self.department.trim() == other.department.trim()
    }
}
