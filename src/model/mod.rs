pub mod employee;
pub mod grade;
pub mod leave_request;
pub mod role;
pub mod vehicle_booking;
