use crate::api::leave_request::{CorrectLeave, LeaveFilter, LeaveListResponse, ReviewComment};
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::grade::Grade;
use crate::model::leave_request::{
    ApprovalLevel, LeaveRequest, LeaveType, LogAction, RequestLog, RequestStatus, TransportMode,
};
use crate::model::role::Role;
use crate::model::vehicle_booking::{BookingStatus, VehicleBooking};
use crate::rules::approval::Route;
use crate::rules::entitlement::{CycleRange, QuotaSummary};
use crate::rules::stats::EmployeeHours;
use crate::service::leave_service::{LeaveDraft, Preview, QueuedRequest, VehicleAvailability};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave & Overtime API",
        version = "1.0.0",
        description = r#"
## Leave, Overtime & Business-Trip Requests

Duration, entitlement and approval routing for employee time-off requests.

### Key Features
- **Submission**
  - Chargeable hours from the 08:00-17:30 work grid, overtime from 18:00
  - Overlap, quota and company-car checks before anything is stored
- **Approval**
  - Department stage, general-manager stage for managers and long leave
  - Append-only approval history on every request
- **Reporting**
  - Quota per leave year, approver queues and yearly hours per employee

### Security
All endpoints require a **JWT Bearer** access token linked to an employee record.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::preview_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::correct_leave,
        crate::api::leave_request::pending_leaves,
        crate::api::leave_request::leave_quota,
        crate::api::leave_request::leave_stats,
        crate::api::leave_request::complete_leaves,

        crate::api::vehicle::vehicle_availability
    ),
    components(
        schemas(
            LeaveFilter,
            LeaveListResponse,
            LeaveDraft,
            ReviewComment,
            CorrectLeave,
            Preview,
            Route,
            QuotaSummary,
            CycleRange,
            EmployeeHours,
            QueuedRequest,
            VehicleAvailability,
            VehicleBooking,
            BookingStatus,
            LeaveRequest,
            RequestLog,
            LeaveType,
            RequestStatus,
            ApprovalLevel,
            TransportMode,
            LogAction,
            Employee,
            EmployeeStatus,
            Grade,
            Role
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave, overtime and business-trip requests"),
        (name = "Vehicle", description = "Company car availability"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_leave_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/leave"));
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}/approve"));
        assert!(doc.paths.paths.contains_key("/api/vehicles/{vehicle_id}/availability"));
    }
}
