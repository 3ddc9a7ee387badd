use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_request::RequestStatus;

/// Lifecycle of a company-car reservation.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
    /// The car was handed back.
    Returned,
}

/// Booking state mirrored from the business trip it belongs to.
impl From<RequestStatus> for BookingStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::PendingDept | RequestStatus::PendingGm => BookingStatus::Pending,
            RequestStatus::Approved => BookingStatus::Approved,
            RequestStatus::Rejected => BookingStatus::Rejected,
            RequestStatus::Cancelled => BookingStatus::Cancelled,
            RequestStatus::Completed => BookingStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VehicleBooking {
    pub id: u64,
    pub vehicle_id: u64,
    /// Business trip this booking was created for, if any.
    pub leave_request_id: Option<u64>,
    pub employee_id: u64,
    /// Display name of the booker, joined from `employees`.
    pub booker_name: Option<String>,
    #[schema(value_type = String, example = "2026-03-02T08:00:00")]
    pub start_time: NaiveDateTime,
    #[schema(value_type = String, example = "2026-03-02T17:30:00")]
    pub end_time: NaiveDateTime,
    pub purpose: Option<String>,
    pub status: BookingStatus,
}

impl VehicleBooking {
    /// Whether the booking still holds the vehicle.
    pub fn is_active(&self) -> bool {
        !matches!(
            self.status,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Returned
        )
    }
}

/// Companion booking created together with a company-car business trip.
#[derive(Debug, Clone)]
pub struct NewVehicleBooking {
    pub vehicle_id: u64,
    pub purpose: String,
}
