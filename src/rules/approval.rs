//! Approval routing: the initial status of a submission, the approve /
//! reject / cancel transitions and who may perform them.

use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::employee::Employee;
use crate::model::grade::Grade;
use crate::model::leave_request::{ApprovalLevel, LeaveRequest, LogAction, RequestStatus};
use crate::rules::error::{LeaveError, Result};
use crate::rules::policy::LeavePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Route {
    pub status: RequestStatus,
    pub approval_level: ApprovalLevel,
}

/// Required sign-off tier for a rank-and-file request of `hours`.
pub fn level_for_hours(hours: f64, policy: &LeavePolicy) -> ApprovalLevel {
    if policy.is_long_leave(hours) {
        ApprovalLevel::GeneralManager
    } else {
        ApprovalLevel::DeptManager
    }
}

/// Where a fresh submission starts.
///
/// General managers (and admins) are approved on the spot, managers go
/// straight to the general manager, everyone else starts with their
/// department and escalates only for long leave.
pub fn initial_route(requester: &Employee, hours: f64, policy: &LeavePolicy) -> Route {
    if requester.is_general_manager() {
        Route {
            status: RequestStatus::Approved,
            approval_level: ApprovalLevel::GeneralManager,
        }
    } else if requester.grade == Grade::Manager {
        Route {
            status: RequestStatus::PendingGm,
            approval_level: ApprovalLevel::GeneralManager,
        }
    } else {
        Route {
            status: RequestStatus::PendingDept,
            approval_level: level_for_hours(hours, policy),
        }
    }
}

/// Supervisors work under a responsibility system and cannot claim overtime.
pub fn ensure_overtime_eligible(requester: &Employee) -> Result<()> {
    if requester.grade.is_supervisor() {
        return Err(LeaveError::PermissionDenied(
            "supervisory grades are not eligible for overtime".into(),
        ));
    }
    Ok(())
}

/// Status after an approval, and the log action recording it.
pub fn next_on_approve(
    status: RequestStatus,
    level: ApprovalLevel,
) -> Result<(RequestStatus, LogAction)> {
    match status {
        RequestStatus::PendingDept if level == ApprovalLevel::GeneralManager => {
            Ok((RequestStatus::PendingGm, LogAction::Escalated))
        }
        RequestStatus::PendingDept | RequestStatus::PendingGm => {
            Ok((RequestStatus::Approved, LogAction::Approved))
        }
        other => Err(LeaveError::InvalidTransition {
            action: "approve",
            status: other,
        }),
    }
}

pub fn next_on_reject(status: RequestStatus) -> Result<RequestStatus> {
    if status.is_pending() {
        Ok(RequestStatus::Rejected)
    } else {
        Err(LeaveError::InvalidTransition {
            action: "reject",
            status,
        })
    }
}

/// Whether `approver` may approve or reject a request of `requester`
/// currently in `status`.
pub fn can_review(approver: &Employee, requester: &Employee, status: RequestStatus) -> bool {
    if approver.id == requester.id {
        return false;
    }
    match status {
        RequestStatus::PendingGm => approver.is_general_manager(),
        RequestStatus::PendingDept => {
            if !approver.same_department(requester) {
                return false;
            }
            match approver.grade {
                Grade::Manager => requester.grade != Grade::GeneralManager,
                // Chiefs only review their own reports, never peers or superiors.
                Grade::Chief => requester.grade == Grade::Ic,
                Grade::Ic | Grade::GeneralManager => false,
            }
        }
        _ => false,
    }
}

pub fn ensure_can_review(
    approver: &Employee,
    requester: &Employee,
    status: RequestStatus,
) -> Result<()> {
    if approver.id == requester.id {
        return Err(LeaveError::PermissionDenied(
            "requests cannot be approved by their own requester".into(),
        ));
    }
    if !can_review(approver, requester, status) {
        return Err(LeaveError::PermissionDenied(format!(
            "{} may not review this request at stage {}",
            approver.full_name, status
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelKind {
    /// The requester withdrawing a request that has not ended yet.
    Own,
    /// An admin cancelling any live request.
    Forced,
}

impl CancelKind {
    pub fn log_action(self) -> LogAction {
        match self {
            CancelKind::Own => LogAction::Cancelled,
            CancelKind::Forced => LogAction::ForceCancelled,
        }
    }
}

pub fn cancel_kind(actor: &Employee, request: &LeaveRequest, now: NaiveDateTime) -> Result<CancelKind> {
    if request.status.is_terminal() {
        return Err(LeaveError::InvalidTransition {
            action: "cancel",
            status: request.status,
        });
    }
    if actor.is_admin() {
        return Ok(CancelKind::Forced);
    }
    if actor.id != request.employee_id {
        return Err(LeaveError::PermissionDenied(
            "only the requester or an admin may cancel a request".into(),
        ));
    }
    if request.end_time <= now {
        return Err(LeaveError::PermissionDenied(
            "the request has already ended".into(),
        ));
    }
    Ok(CancelKind::Own)
}
