//! Persistence seam between the leave service and the shared store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::leave_request::{
    ApprovalLevel, LeaveRequest, NewLeaveRequest, RequestLog, RequestStatus,
};
use crate::model::vehicle_booking::{NewVehicleBooking, VehicleBooking};

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// Filters for request listings; `None` means "any".
///
/// Listings come back newest first. `limit` and `offset` page through that
/// order and are left unset by callers that need the whole set.
#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub employee_id: Option<u64>,
    pub status: Option<RequestStatus>,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// New window and recomputed figures for an admin correction.
#[derive(Debug, Clone)]
pub struct Correction {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub overtime_hours: Option<f64>,
    pub meal_allowance: bool,
    pub approval_level: ApprovalLevel,
}

/// Employee presence written together with a request status change.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceUpdate {
    pub employee_id: u64,
    pub status: EmployeeStatus,
    pub location_detail: Option<String>,
    pub expected_return: Option<NaiveDateTime>,
}

impl PresenceUpdate {
    /// Back at the desk, with the away details cleared.
    pub fn in_office(employee_id: u64) -> Self {
        Self {
            employee_id,
            status: EmployeeStatus::InOffice,
            location_detail: None,
            expected_return: None,
        }
    }
}

/// CRUD over employees, leave requests and vehicle bookings.
///
/// Implementations append logs and never rewrite them. A status change, its
/// log entry, the linked vehicle booking and any presence update form one
/// unit of work: either all of them are stored or none is.
#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn employee(&self, id: u64) -> Result<Option<Employee>>;

    async fn employees(&self, department: Option<&str>) -> Result<Vec<Employee>>;

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>>;

    async fn requests(&self, filter: &RequestFilter) -> Result<Vec<LeaveRequest>>;

    /// Rows matching `filter`, ignoring its `limit` and `offset`.
    async fn count_requests(&self, filter: &RequestFilter) -> Result<i64>;

    /// Inserts the request and, for company-car trips, its linked booking.
    async fn insert_request(
        &self,
        request: NewLeaveRequest,
        booking: Option<NewVehicleBooking>,
        presence: Option<PresenceUpdate>,
    ) -> Result<LeaveRequest>;

    /// Moves request `id` from `from` to `to`.
    ///
    /// Returns `false` and writes nothing when the stored status is no
    /// longer `from`.
    async fn update_status(
        &self,
        id: u64,
        from: RequestStatus,
        to: RequestStatus,
        log: RequestLog,
        presence: Option<PresenceUpdate>,
    ) -> Result<bool>;

    async fn correct_request(&self, id: u64, correction: Correction, log: RequestLog)
    -> Result<()>;

    async fn vehicle_bookings(&self, vehicle_id: u64) -> Result<Vec<VehicleBooking>>;

    async fn booking_for_request(&self, leave_request_id: u64) -> Result<Option<VehicleBooking>>;
}
