use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::grade::Grade;
use crate::model::leave_request::{
    LeaveRequest, LeaveType, LogAction, NewLeaveRequest, RequestLog, RequestStatus, TransportMode,
};
use crate::model::vehicle_booking::NewVehicleBooking;
use crate::rules::approval::{
    Route, cancel_kind, can_review, ensure_can_review, ensure_overtime_eligible, initial_route,
    level_for_hours, next_on_approve, next_on_reject,
};
use crate::rules::duration::{chargeable_hours, meal_allowance, validate_hours};
use crate::rules::entitlement::{QuotaSummary, ensure_quota, quota_summary};
use crate::rules::error::{ConflictSummary, LeaveError, Result};
use crate::rules::overlap::{ensure_no_overlap, ensure_vehicle_available, find_conflict, find_vehicle_conflict};
use crate::rules::policy::LeavePolicy;
use crate::rules::stats::{
    EmployeeHours, MONTHLY_OVERTIME_WARNING_HOURS, monthly_overtime_hours, yearly_hours,
};
use crate::store::{Correction, LeaveStore, PresenceUpdate, RequestFilter};

/// What an employee fills in on the request form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveDraft {
    pub leave_type: LeaveType,
    #[schema(value_type = String, example = "2026-03-02T08:00:00")]
    pub start_time: NaiveDateTime,
    #[schema(value_type = String, example = "2026-03-02T17:30:00")]
    pub end_time: NaiveDateTime,
    #[schema(example = "family trip")]
    pub reason: String,
    /// Business trips only.
    pub transport_mode: Option<TransportMode>,
    /// Required when `transport_mode` is `company_car`.
    pub vehicle_id: Option<u64>,
}

/// Figures shown while the form is being filled in. Nothing is written.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Preview {
    pub hours: f64,
    pub meal_allowance: bool,
    pub route: Route,
    pub quota: Option<QuotaSummary>,
    /// Message of the first rule the draft breaks, if any.
    pub violation: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub conflict: Option<ConflictSummary>,
}

/// A request in an approver's queue.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueuedRequest {
    #[serde(flatten)]
    pub request: LeaveRequest,
    /// Overtime only: the employee's approved overtime in the request's
    /// month plus this request.
    pub monthly_overtime_hours: Option<f64>,
    /// Set when `monthly_overtime_hours` goes past the monthly limit.
    pub overtime_warning: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VehicleAvailability {
    pub vehicle_id: u64,
    pub available: bool,
    pub booker: Option<String>,
}

/// Read-validate-write flows of the leave engine.
///
/// Every precondition is checked before the single store write of an
/// operation, and presence changes ride along in that write, so a failed
/// call leaves no partial state behind. Overlap and
/// quota checks are read-then-decide and are not serialized against
/// concurrent submissions.
pub struct LeaveService {
    store: Arc<dyn LeaveStore>,
    policy: LeavePolicy,
}

impl LeaveService {
    pub fn new(store: Arc<dyn LeaveStore>, policy: LeavePolicy) -> Self {
        Self { store, policy }
    }

    async fn employee(&self, id: u64) -> Result<Employee> {
        self.store
            .employee(id)
            .await?
            .ok_or_else(|| LeaveError::NotFound(format!("employee {id}")))
    }

    async fn request(&self, id: u64) -> Result<LeaveRequest> {
        self.store
            .request(id)
            .await?
            .ok_or_else(|| LeaveError::NotFound(format!("leave request {id}")))
    }

    async fn requests_of(&self, employee_id: u64) -> Result<Vec<LeaveRequest>> {
        let filter = RequestFilter {
            employee_id: Some(employee_id),
            ..Default::default()
        };
        Ok(self.store.requests(&filter).await?)
    }

    /// Companion booking for a company-car trip, after checking the car is free.
    async fn companion_booking(
        &self,
        draft: &LeaveDraft,
    ) -> Result<Option<NewVehicleBooking>> {
        if draft.leave_type != LeaveType::Business
            || draft.transport_mode != Some(TransportMode::CompanyCar)
        {
            return Ok(None);
        }
        let vehicle_id = draft.vehicle_id.ok_or(LeaveError::VehicleRequired)?;
        let bookings = self.store.vehicle_bookings(vehicle_id).await?;
        ensure_vehicle_available(&bookings, vehicle_id, draft.start_time, draft.end_time, None)?;
        Ok(Some(NewVehicleBooking {
            vehicle_id,
            purpose: format!("company car for business trip: {}", draft.reason.trim()),
        }))
    }

    /// Current status of `request_id` after a guarded write found it moved on.
    async fn moved_on(&self, request_id: u64, action: &'static str) -> LeaveError {
        match self.request(request_id).await {
            Ok(current) => LeaveError::InvalidTransition {
                action,
                status: current.status,
            },
            Err(e) => e,
        }
    }

    fn check_draft(&self, requester: &Employee, draft: &LeaveDraft, hours: f64) -> Result<()> {
        if draft.leave_type.is_overtime() {
            ensure_overtime_eligible(requester)?;
        }
        if draft.reason.trim().is_empty() {
            return Err(LeaveError::MissingReason);
        }
        validate_hours(draft.leave_type, draft.start_time, hours)
    }

    #[instrument(skip(self, draft), fields(leave_type = %draft.leave_type))]
    pub async fn preview(
        &self,
        employee_id: u64,
        draft: &LeaveDraft,
        now: NaiveDateTime,
    ) -> Result<Preview> {
        let requester = self.employee(employee_id).await?;
        let existing = self.requests_of(employee_id).await?;
        let hours = chargeable_hours(draft.start_time, draft.end_time, draft.leave_type.is_overtime());

        let quota = draft.leave_type.is_quota_bearing().then(|| {
            quota_summary(&requester, draft.leave_type, &existing, &self.policy, now.date())
        });
        let violation = self
            .check_draft(&requester, draft, hours)
            .and_then(|_| match &quota {
                Some(summary) => ensure_quota(summary, hours),
                None => Ok(()),
            })
            .err()
            .map(|e| e.to_string());

        Ok(Preview {
            hours,
            meal_allowance: meal_allowance(draft.leave_type, draft.end_time),
            route: initial_route(&requester, hours, &self.policy),
            quota,
            violation,
            conflict: find_conflict(&existing, draft.start_time, draft.end_time, None),
        })
    }

    #[instrument(skip(self, draft), fields(leave_type = %draft.leave_type))]
    pub async fn submit(
        &self,
        employee_id: u64,
        draft: LeaveDraft,
        now: NaiveDateTime,
    ) -> Result<LeaveRequest> {
        let result = self.try_submit(employee_id, draft, now).await;
        match &result {
            Ok(request) => info!(
                leave_id = request.id,
                status = %request.status,
                approval_level = %request.approval_level,
                "Leave request submitted"
            ),
            Err(LeaveError::Backend(e)) => error!(error = %e, "Leave submission failed"),
            Err(e) => warn!(error = %e, code = e.code(), "Leave submission rejected"),
        }
        result
    }

    async fn try_submit(
        &self,
        employee_id: u64,
        draft: LeaveDraft,
        now: NaiveDateTime,
    ) -> Result<LeaveRequest> {
        let requester = self.employee(employee_id).await?;
        let is_overtime = draft.leave_type.is_overtime();
        let hours = chargeable_hours(draft.start_time, draft.end_time, is_overtime);
        self.check_draft(&requester, &draft, hours)?;

        let existing = self.requests_of(employee_id).await?;
        ensure_no_overlap(&existing, draft.start_time, draft.end_time, None)?;

        if draft.leave_type.is_quota_bearing() {
            let summary =
                quota_summary(&requester, draft.leave_type, &existing, &self.policy, now.date());
            ensure_quota(&summary, hours)?;
        }

        let booking = self.companion_booking(&draft).await?;
        let route = initial_route(&requester, hours, &self.policy);

        let mut comment = format!("hours: {hours}hr");
        if self.policy.is_long_leave(hours) {
            comment.push_str(" (long leave, department and general manager sign-off required)");
        }
        let transport_mode = if draft.leave_type == LeaveType::Business {
            draft.transport_mode
        } else {
            None
        };

        let new_request = NewLeaveRequest {
            employee_id,
            leave_type: draft.leave_type,
            start_time: draft.start_time,
            end_time: draft.end_time,
            reason: draft.reason.trim().to_string(),
            status: route.status,
            overtime_hours: is_overtime.then_some(hours),
            meal_allowance: meal_allowance(draft.leave_type, draft.end_time),
            transport_mode,
            approval_level: route.approval_level,
            log: RequestLog::new(LogAction::Submitted, &requester.full_name, now)
                .with_comment(comment),
            created_at: now,
        };

        let presence = if route.status == RequestStatus::Approved {
            away_presence(
                employee_id,
                new_request.leave_type,
                new_request.start_time,
                new_request.end_time,
                &new_request.reason,
                now,
            )
        } else {
            None
        };
        let stored = self
            .store
            .insert_request(new_request, booking, presence.clone())
            .await?;
        if let Some(update) = presence {
            info!(employee_id, status = %update.status, "Employee presence updated");
        }
        Ok(stored)
    }

    #[instrument(skip(self, comment))]
    pub async fn approve(
        &self,
        approver_id: u64,
        request_id: u64,
        comment: Option<String>,
        now: NaiveDateTime,
    ) -> Result<LeaveRequest> {
        let approver = self.employee(approver_id).await?;
        let request = self.request(request_id).await?;
        let requester = self.employee(request.employee_id).await?;

        let (next, action) = next_on_approve(request.status, request.approval_level)?;
        ensure_can_review(&approver, &requester, request.status)?;

        let mut log = RequestLog::new(action, &approver.full_name, now);
        log.comment = match (action, comment) {
            (LogAction::Escalated, Some(c)) => Some(format!("forwarded to general manager: {c}")),
            (LogAction::Escalated, None) => Some("forwarded to general manager".to_string()),
            (_, c) => c,
        };
        let presence = if next == RequestStatus::Approved {
            away_presence(
                request.employee_id,
                request.leave_type,
                request.start_time,
                request.end_time,
                &request.reason,
                now,
            )
        } else {
            None
        };
        let applied = self
            .store
            .update_status(request_id, request.status, next, log, presence.clone())
            .await?;
        if !applied {
            return Err(self.moved_on(request_id, "approve").await);
        }
        info!(leave_id = request_id, from = %request.status, to = %next, "Leave request approved");
        if let Some(update) = presence {
            info!(employee_id = update.employee_id, status = %update.status, "Employee presence updated");
        }

        self.request(request_id).await
    }

    #[instrument(skip(self, comment))]
    pub async fn reject(
        &self,
        approver_id: u64,
        request_id: u64,
        comment: Option<String>,
        now: NaiveDateTime,
    ) -> Result<LeaveRequest> {
        let approver = self.employee(approver_id).await?;
        let request = self.request(request_id).await?;
        let requester = self.employee(request.employee_id).await?;

        let next = next_on_reject(request.status)?;
        ensure_can_review(&approver, &requester, request.status)?;

        let mut log = RequestLog::new(LogAction::Rejected, &approver.full_name, now);
        log.comment = comment;
        let applied = self
            .store
            .update_status(request_id, request.status, next, log, None)
            .await?;
        if !applied {
            return Err(self.moved_on(request_id, "reject").await);
        }
        info!(leave_id = request_id, from = %request.status, "Leave request rejected");

        self.request(request_id).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        actor_id: u64,
        request_id: u64,
        now: NaiveDateTime,
    ) -> Result<LeaveRequest> {
        let actor = self.employee(actor_id).await?;
        let request = self.request(request_id).await?;
        let kind = cancel_kind(&actor, &request, now)?;

        let log = RequestLog::new(kind.log_action(), &actor.full_name, now);
        let in_effect = request.start_time <= now && request.end_time > now;
        let presence = (request.status == RequestStatus::Approved && in_effect)
            .then(|| PresenceUpdate::in_office(request.employee_id));
        let applied = self
            .store
            .update_status(request_id, request.status, RequestStatus::Cancelled, log, presence)
            .await?;
        if !applied {
            return Err(self.moved_on(request_id, "cancel").await);
        }
        info!(leave_id = request_id, kind = ?kind, "Leave request cancelled");

        self.request(request_id).await
    }

    /// Admin correction of a live request's time window.
    #[instrument(skip(self))]
    pub async fn correct(
        &self,
        actor_id: u64,
        request_id: u64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<LeaveRequest> {
        let actor = self.employee(actor_id).await?;
        if !actor.is_admin() {
            return Err(LeaveError::PermissionDenied(
                "only admins may correct a request".into(),
            ));
        }
        let request = self.request(request_id).await?;
        if request.status.is_terminal() || request.status == RequestStatus::Completed {
            return Err(LeaveError::InvalidTransition {
                action: "correct",
                status: request.status,
            });
        }

        let hours = chargeable_hours(start_time, end_time, request.is_overtime());
        validate_hours(request.leave_type, start_time, hours)?;

        let existing = self.requests_of(request.employee_id).await?;
        ensure_no_overlap(&existing, start_time, end_time, Some(request_id))?;

        if request.uses_company_car() {
            if let Some(booking) = self.store.booking_for_request(request_id).await? {
                let bookings = self.store.vehicle_bookings(booking.vehicle_id).await?;
                ensure_vehicle_available(
                    &bookings,
                    booking.vehicle_id,
                    start_time,
                    end_time,
                    Some(request_id),
                )?;
            }
        }

        let approval_level = if request.status == RequestStatus::PendingDept {
            level_for_hours(hours, &self.policy)
        } else {
            request.approval_level
        };
        let correction = Correction {
            start_time,
            end_time,
            overtime_hours: request.is_overtime().then_some(hours),
            meal_allowance: meal_allowance(request.leave_type, end_time),
            approval_level,
        };
        let log = RequestLog::new(LogAction::Corrected, &actor.full_name, now).with_comment(
            format!(
                "{} ~ {} → {} ~ {} ({hours}hr)",
                request.start_time, request.end_time, start_time, end_time
            ),
        );
        self.store.correct_request(request_id, correction, log).await?;
        info!(leave_id = request_id, hours, "Leave request corrected");

        self.request(request_id).await
    }

    /// Closes every approved request that has ended by `now`.
    #[instrument(skip(self))]
    pub async fn complete_elapsed(&self, actor_id: u64, now: NaiveDateTime) -> Result<usize> {
        let actor = self.employee(actor_id).await?;
        if !actor.is_admin() {
            return Err(LeaveError::PermissionDenied(
                "only admins may close out requests".into(),
            ));
        }
        let filter = RequestFilter {
            status: Some(RequestStatus::Approved),
            ..Default::default()
        };
        let elapsed: Vec<_> = self
            .store
            .requests(&filter)
            .await?
            .into_iter()
            .filter(|r| r.end_time <= now)
            .collect();

        let mut completed = 0;
        for request in &elapsed {
            let log = RequestLog::new(LogAction::Completed, &actor.full_name, now);
            // A request cancelled since the listing is skipped.
            if self
                .store
                .update_status(request.id, RequestStatus::Approved, RequestStatus::Completed, log, None)
                .await?
            {
                completed += 1;
            }
        }
        info!(count = completed, "Elapsed leave requests completed");
        Ok(completed)
    }

    pub async fn quota(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        today: NaiveDate,
    ) -> Result<QuotaSummary> {
        let employee = self.employee(employee_id).await?;
        let existing = self.requests_of(employee_id).await?;
        Ok(quota_summary(&employee, leave_type, &existing, &self.policy, today))
    }

    /// Summaries for every quota-bearing leave type.
    pub async fn quotas(&self, employee_id: u64, today: NaiveDate) -> Result<Vec<QuotaSummary>> {
        let employee = self.employee(employee_id).await?;
        let existing = self.requests_of(employee_id).await?;
        Ok(LeaveType::iter()
            .filter(|t| t.is_quota_bearing())
            .map(|t| quota_summary(&employee, t, &existing, &self.policy, today))
            .collect())
    }

    /// Requests waiting on `approver_id`, oldest first.
    ///
    /// Overtime entries carry the employee's running total for the month so
    /// the reviewer sees when approving would push it past the limit.
    pub async fn pending_for(&self, approver_id: u64) -> Result<Vec<QueuedRequest>> {
        let approver = self.employee(approver_id).await?;
        let employees: HashMap<u64, Employee> = self
            .store
            .employees(None)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let mut pending = Vec::new();
        for status in [RequestStatus::PendingDept, RequestStatus::PendingGm] {
            let filter = RequestFilter {
                status: Some(status),
                ..Default::default()
            };
            pending.extend(
                self.store
                    .requests(&filter)
                    .await?
                    .into_iter()
                    .filter(|r| {
                        employees
                            .get(&r.employee_id)
                            .is_some_and(|requester| can_review(&approver, requester, r.status))
                    }),
            );
        }
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let approved = if pending.iter().any(LeaveRequest::is_overtime) {
            let filter = RequestFilter {
                status: Some(RequestStatus::Approved),
                ..Default::default()
            };
            self.store.requests(&filter).await?
        } else {
            Vec::new()
        };

        Ok(pending
            .into_iter()
            .map(|request| {
                let month_total = request.is_overtime().then(|| {
                    monthly_overtime_hours(&approved, request.employee_id, request.start_time)
                        + request.overtime_hours.unwrap_or(0.0)
                });
                QueuedRequest {
                    monthly_overtime_hours: month_total,
                    overtime_warning: month_total
                        .is_some_and(|total| total > MONTHLY_OVERTIME_WARNING_HOURS),
                    request,
                }
            })
            .collect())
    }

    /// Own history for employees; admins see everyone, optionally filtered.
    ///
    /// Returns the requested page and the number of matching requests.
    pub async fn history(
        &self,
        actor_id: u64,
        mut filter: RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64)> {
        let actor = self.employee(actor_id).await?;
        if !actor.is_admin() {
            filter.employee_id = Some(actor_id);
        }
        let total = self.store.count_requests(&filter).await?;
        let rows = self.store.requests(&filter).await?;
        Ok((rows, total))
    }

    /// Admins, the requester, current reviewers and anyone who already acted
    /// on the request may read it.
    pub async fn get(&self, actor_id: u64, request_id: u64) -> Result<LeaveRequest> {
        let actor = self.employee(actor_id).await?;
        let request = self.request(request_id).await?;
        if actor.is_admin()
            || actor.id == request.employee_id
            || request.logs.iter().any(|log| log.actor_name == actor.full_name)
        {
            return Ok(request);
        }
        let requester = self.employee(request.employee_id).await?;
        if can_review(&actor, &requester, request.status) {
            Ok(request)
        } else {
            Err(LeaveError::PermissionDenied(
                "not allowed to view this request".into(),
            ))
        }
    }

    /// Per-employee hours for `year`.
    ///
    /// Managers and chiefs only see their own department.
    pub async fn yearly_stats(
        &self,
        actor_id: u64,
        year: i32,
        department: Option<String>,
    ) -> Result<Vec<EmployeeHours>> {
        let actor = self.employee(actor_id).await?;
        let department = if actor.is_general_manager() {
            department
        } else if matches!(actor.grade, Grade::Manager | Grade::Chief) {
            match department {
                Some(d) if d.trim() != actor.department.trim() => {
                    return Err(LeaveError::PermissionDenied(
                        "statistics are limited to your own department".into(),
                    ));
                }
                _ => Some(actor.department.clone()),
            }
        } else {
            return Err(LeaveError::PermissionDenied(
                "statistics are available to supervisors only".into(),
            ));
        };

        let employees = self.store.employees(department.as_deref()).await?;
        let filter = RequestFilter {
            year: Some(year),
            department,
            ..Default::default()
        };
        let requests = self.store.requests(&filter).await?;
        Ok(yearly_hours(&employees, &requests, year))
    }

    pub async fn vehicle_availability(
        &self,
        vehicle_id: u64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Result<VehicleAvailability> {
        let bookings = self.store.vehicle_bookings(vehicle_id).await?;
        let conflict = find_vehicle_conflict(&bookings, vehicle_id, start_time, end_time, None);
        Ok(VehicleAvailability {
            vehicle_id,
            available: conflict.is_none(),
            booker: conflict.map(|b| {
                b.booker_name
                    .clone()
                    .unwrap_or_else(|| format!("employee #{}", b.employee_id))
            }),
        })
    }
}

/// Presence for an approved request, if it is in effect at `now`.
fn away_presence(
    employee_id: u64,
    leave_type: LeaveType,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    reason: &str,
    now: NaiveDateTime,
) -> Option<PresenceUpdate> {
    if start_time > now || end_time <= now {
        return None;
    }
    let status = if leave_type == LeaveType::Business {
        EmployeeStatus::Out
    } else {
        EmployeeStatus::Leave
    };
    Some(PresenceUpdate {
        employee_id,
        status,
        location_detail: Some(reason.to_string()),
        expected_return: Some(end_time),
    })
}
