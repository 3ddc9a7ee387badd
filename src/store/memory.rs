use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Datelike;
use parking_lot::Mutex;

use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, NewLeaveRequest, RequestLog, RequestStatus};
use crate::model::vehicle_booking::{BookingStatus, NewVehicleBooking, VehicleBooking};
use crate::store::{Correction, LeaveStore, PresenceUpdate, RequestFilter};

#[derive(Default)]
struct State {
    employees: Vec<Employee>,
    requests: Vec<LeaveRequest>,
    bookings: Vec<VehicleBooking>,
    /// Makes every presence write fail, as a lost connection would.
    presence_offline: bool,
}

impl State {
    /// Index of the employee `update` targets. Checked before anything else
    /// in the unit of work is touched.
    fn presence_target(&self, update: &PresenceUpdate) -> Result<usize> {
        if self.presence_offline {
            bail!("employee presence store unavailable");
        }
        self.employees
            .iter()
            .position(|e| e.id == update.employee_id)
            .ok_or_else(|| anyhow!("employee {} missing", update.employee_id))
    }

    fn apply_presence(&mut self, index: usize, update: PresenceUpdate) {
        let employee = &mut self.employees[index];
        employee.current_status = update.status;
        employee.location_detail = update.location_detail;
        employee.expected_return = update.expected_return;
    }

    fn matching(&self, filter: &RequestFilter) -> Vec<LeaveRequest> {
        let mut rows: Vec<LeaveRequest> = self
            .requests
            .iter()
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.year.is_none_or(|y| r.start_time.year() == y))
            .filter(|r| {
                filter.department.as_deref().is_none_or(|d| {
                    self.employees
                        .iter()
                        .any(|e| e.id == r.employee_id && e.department.trim() == d.trim())
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }
}

/// In-process `LeaveStore` used by the service and API tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn with_employees(employees: Vec<Employee>) -> Self {
        Self {
            state: Mutex::new(State {
                employees,
                ..Default::default()
            }),
        }
    }

    pub fn add_booking(&self, booking: VehicleBooking) {
        self.state.lock().bookings.push(booking);
    }

    pub fn bookings(&self) -> Vec<VehicleBooking> {
        self.state.lock().bookings.clone()
    }

    pub fn employee_snapshot(&self, id: u64) -> Option<Employee> {
        self.state.lock().employees.iter().find(|e| e.id == id).cloned()
    }

    /// Overwrites an employee's presence outside any request flow.
    pub fn set_presence(&self, update: PresenceUpdate) {
        let mut state = self.state.lock();
        if let Some(index) = state.employees.iter().position(|e| e.id == update.employee_id) {
            state.apply_presence(index, update);
        }
    }

    pub fn fail_presence_writes(&self, failing: bool) {
        self.state.lock().presence_offline = failing;
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn employee(&self, id: u64) -> Result<Option<Employee>> {
        Ok(self.employee_snapshot(id))
    }

    async fn employees(&self, department: Option<&str>) -> Result<Vec<Employee>> {
        Ok(self
            .state
            .lock()
            .employees
            .iter()
            .filter(|e| department.is_none_or(|d| e.department.trim() == d.trim()))
            .cloned()
            .collect())
    }

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>> {
        Ok(self.state.lock().requests.iter().find(|r| r.id == id).cloned())
    }

    async fn requests(&self, filter: &RequestFilter) -> Result<Vec<LeaveRequest>> {
        let rows = self.state.lock().matching(filter);
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_requests(&self, filter: &RequestFilter) -> Result<i64> {
        Ok(self.state.lock().matching(filter).len() as i64)
    }

    async fn insert_request(
        &self,
        request: NewLeaveRequest,
        booking: Option<NewVehicleBooking>,
        presence: Option<PresenceUpdate>,
    ) -> Result<LeaveRequest> {
        let mut state = self.state.lock();
        let target = presence
            .as_ref()
            .map(|update| state.presence_target(update))
            .transpose()?;

        let id = state.requests.len() as u64 + 1;
        let stored = LeaveRequest {
            id,
            employee_id: request.employee_id,
            leave_type: request.leave_type,
            start_time: request.start_time,
            end_time: request.end_time,
            reason: request.reason,
            status: request.status,
            overtime_hours: request.overtime_hours,
            meal_allowance: request.meal_allowance,
            transport_mode: request.transport_mode,
            approval_level: request.approval_level,
            logs: vec![request.log],
            created_at: request.created_at,
        };
        if let Some(booking) = booking {
            let booking_id = state.bookings.len() as u64 + 1;
            let booker_name = state
                .employees
                .iter()
                .find(|e| e.id == stored.employee_id)
                .map(|e| e.full_name.clone());
            state.bookings.push(VehicleBooking {
                id: booking_id,
                vehicle_id: booking.vehicle_id,
                leave_request_id: Some(id),
                employee_id: stored.employee_id,
                booker_name,
                start_time: stored.start_time,
                end_time: stored.end_time,
                purpose: Some(booking.purpose),
                status: stored.status.into(),
            });
        }
        state.requests.push(stored.clone());
        if let (Some(index), Some(update)) = (target, presence) {
            state.apply_presence(index, update);
        }
        Ok(stored)
    }

    async fn update_status(
        &self,
        id: u64,
        from: RequestStatus,
        to: RequestStatus,
        log: RequestLog,
        presence: Option<PresenceUpdate>,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        let index = state
            .requests
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| anyhow!("leave request {id} missing"))?;
        if state.requests[index].status != from {
            return Ok(false);
        }
        let target = presence
            .as_ref()
            .map(|update| state.presence_target(update))
            .transpose()?;

        let request = &mut state.requests[index];
        request.status = to;
        request.logs.push(log);
        state
            .bookings
            .iter_mut()
            .filter(|b| b.leave_request_id == Some(id))
            .for_each(|b| b.status = BookingStatus::from(to));
        if let (Some(index), Some(update)) = (target, presence) {
            state.apply_presence(index, update);
        }
        Ok(true)
    }

    async fn correct_request(
        &self,
        id: u64,
        correction: Correction,
        log: RequestLog,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("leave request {id} missing"))?;
        request.start_time = correction.start_time;
        request.end_time = correction.end_time;
        request.overtime_hours = correction.overtime_hours;
        request.meal_allowance = correction.meal_allowance;
        request.approval_level = correction.approval_level;
        request.logs.push(log);
        state
            .bookings
            .iter_mut()
            .filter(|b| b.leave_request_id == Some(id))
            .for_each(|b| {
                b.start_time = correction.start_time;
                b.end_time = correction.end_time;
            });
        Ok(())
    }

    async fn vehicle_bookings(&self, vehicle_id: u64) -> Result<Vec<VehicleBooking>> {
        Ok(self
            .state
            .lock()
            .bookings
            .iter()
            .filter(|b| b.vehicle_id == vehicle_id)
            .cloned()
            .collect())
    }

    async fn booking_for_request(&self, leave_request_id: u64) -> Result<Option<VehicleBooking>> {
        Ok(self
            .state
            .lock()
            .bookings
            .iter()
            .find(|b| b.leave_request_id == Some(leave_request_id))
            .cloned())
    }
}
