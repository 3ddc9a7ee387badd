use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Business,
    /// 事假, persisted as `other`.
    #[serde(rename = "other")]
    #[strum(serialize = "other")]
    Personal,
    Overtime,
}

impl LeaveType {
    pub fn is_overtime(self) -> bool {
        self == LeaveType::Overtime
    }

    /// Types that draw down a day-count quota.
    pub fn is_quota_bearing(self) -> bool {
        matches!(self, LeaveType::Annual | LeaveType::Sick | LeaveType::Personal)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    PendingDept,
    PendingGm,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl RequestStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, RequestStatus::PendingDept | RequestStatus::PendingGm)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Cancelled)
    }

    /// Statuses that reserve time and quota: pending requests count the
    /// same as approved ones so a multi-step approval cannot overbook.
    pub fn holds_quota(self) -> bool {
        self.is_pending() || matches!(self, RequestStatus::Approved | RequestStatus::Completed)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalLevel {
    DeptManager,
    GeneralManager,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportMode {
    PersonalCar,
    HsRail,
    CompanyCar,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogAction {
    Submitted,
    Approved,
    Escalated,
    Rejected,
    Cancelled,
    ForceCancelled,
    Corrected,
    Completed,
}

/// One entry of a request's approval history. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestLog {
    pub action: LogAction,
    pub actor_name: String,
    #[schema(value_type = String, example = "2026-03-02T09:12:44")]
    pub timestamp: NaiveDateTime,
    pub comment: Option<String>,
}

impl RequestLog {
    pub fn new(action: LogAction, actor_name: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            action,
            actor_name: actor_name.to_string(),
            timestamp,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "annual",
    "start_time": "2026-03-02T08:00:00",
    "end_time": "2026-03-02T17:30:00",
    "reason": "family trip",
    "status": "pending_dept",
    "overtime_hours": null,
    "meal_allowance": false,
    "transport_mode": null,
    "approval_level": "dept_manager",
    "logs": [{
        "action": "submitted",
        "actor_name": "王小明",
        "timestamp": "2026-02-20T10:00:00",
        "comment": "hours: 8hr"
    }],
    "created_at": "2026-02-20T10:00:00"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveType,
    #[schema(value_type = String)]
    pub start_time: NaiveDateTime,
    #[schema(value_type = String)]
    pub end_time: NaiveDateTime,
    pub reason: String,
    pub status: RequestStatus,
    /// Chargeable hours cached at submission, overtime only.
    pub overtime_hours: Option<f64>,
    pub meal_allowance: bool,
    pub transport_mode: Option<TransportMode>,
    pub approval_level: ApprovalLevel,
    pub logs: Vec<RequestLog>,
    #[schema(value_type = String)]
    pub created_at: NaiveDateTime,
}

impl LeaveRequest {
    pub fn is_overtime(&self) -> bool {
        self.leave_type.is_overtime()
    }

    pub fn uses_company_car(&self) -> bool {
        self.leave_type == LeaveType::Business
            && self.transport_mode == Some(TransportMode::CompanyCar)
    }
}

/// A validated request ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub reason: String,
    pub status: RequestStatus,
    pub overtime_hours: Option<f64>,
    pub meal_allowance: bool,
    pub transport_mode: Option<TransportMode>,
    pub approval_level: ApprovalLevel,
    pub log: RequestLog,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_leave_is_stored_as_other() {
        assert_eq!(LeaveType::Personal.to_string(), "other");
        assert_eq!("other".parse::<LeaveType>().unwrap(), LeaveType::Personal);
        assert_eq!(
            serde_json::to_string(&LeaveType::Personal).unwrap(),
            "\"other\""
        );
    }

    #[test]
    fn pending_and_settled_statuses_hold_quota() {
        assert!(RequestStatus::PendingDept.holds_quota());
        assert!(RequestStatus::PendingGm.holds_quota());
        assert!(RequestStatus::Approved.holds_quota());
        assert!(RequestStatus::Completed.holds_quota());
        assert!(!RequestStatus::Rejected.holds_quota());
        assert!(!RequestStatus::Cancelled.holds_quota());
    }
}
