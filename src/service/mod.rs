pub mod leave_service;
