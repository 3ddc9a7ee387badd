use chrono::NaiveDateTime;

use crate::model::leave_request::LeaveRequest;
use crate::model::vehicle_booking::VehicleBooking;
use crate::rules::error::{ConflictSummary, LeaveError, Result};

/// Half-open ranges touching end-to-start do not overlap.
pub fn overlaps(
    start: NaiveDateTime,
    end: NaiveDateTime,
    other_start: NaiveDateTime,
    other_end: NaiveDateTime,
) -> bool {
    start < other_end && end > other_start
}

/// First live request colliding with `[start, end)`, skipping `exclude`.
pub fn find_conflict(
    existing: &[LeaveRequest],
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude: Option<u64>,
) -> Option<ConflictSummary> {
    existing
        .iter()
        .filter(|r| Some(r.id) != exclude && !r.status.is_terminal())
        .find(|r| overlaps(start, end, r.start_time, r.end_time))
        .map(|r| ConflictSummary {
            request_id: r.id,
            leave_type: r.leave_type,
            start_time: r.start_time,
            end_time: r.end_time,
            reason: r.reason.clone(),
        })
}

pub fn ensure_no_overlap(
    existing: &[LeaveRequest],
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude: Option<u64>,
) -> Result<()> {
    match find_conflict(existing, start, end, exclude) {
        Some(conflict) => Err(LeaveError::OverlapConflict(conflict)),
        None => Ok(()),
    }
}

/// Active booking of `vehicle_id` colliding with `[start, end)`.
///
/// Bookings linked to `exclude_leave` are ignored so a trip can be moved
/// without tripping over its own reservation.
pub fn find_vehicle_conflict<'a>(
    bookings: &'a [VehicleBooking],
    vehicle_id: u64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_leave: Option<u64>,
) -> Option<&'a VehicleBooking> {
    bookings.iter().find(|b| {
        b.vehicle_id == vehicle_id
            && b.is_active()
            && (exclude_leave.is_none() || b.leave_request_id != exclude_leave)
            && overlaps(start, end, b.start_time, b.end_time)
    })
}

pub fn ensure_vehicle_available(
    bookings: &[VehicleBooking],
    vehicle_id: u64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_leave: Option<u64>,
) -> Result<()> {
    match find_vehicle_conflict(bookings, vehicle_id, start, end, exclude_leave) {
        Some(booking) => Err(LeaveError::VehicleUnavailable {
            booker: booking
                .booker_name
                .clone()
                .unwrap_or_else(|| format!("employee #{}", booking.employee_id)),
        }),
        None => Ok(()),
    }
}
