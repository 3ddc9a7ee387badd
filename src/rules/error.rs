use chrono::NaiveDateTime;
use derive_more::Display;
use serde::Serialize;
use thiserror::Error;

use crate::model::leave_request::{LeaveType, RequestStatus};

/// The existing request a new time range collides with.
#[derive(Debug, Clone, PartialEq, Serialize, Display)]
#[display(
    fmt = "overlaps existing {} request {} ~ {} (reason: {})",
    leave_type,
    start_time,
    end_time,
    reason
)]
pub struct ConflictSummary {
    pub request_id: u64,
    pub leave_type: LeaveType,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub reason: String,
}

/// Everything a submission, approval or cancellation can fail with.
///
/// All variants except `Backend` are user-correctable and are raised before
/// any write happens.
#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("insufficient quota: {remaining:.2} days remaining, {requested:.2} days requested")]
    QuotaExceeded { remaining: f64, requested: f64 },

    #[error("{0}")]
    OverlapConflict(ConflictSummary),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("vehicle already booked by {booker} for an overlapping window")]
    VehicleUnavailable { booker: String },

    #[error("a reason is required")]
    MissingReason,

    #[error("a vehicle must be selected for company-car trips")]
    VehicleRequired,

    #[error("cannot {action} a request in status {status}")]
    InvalidTransition {
        action: &'static str,
        status: RequestStatus,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage backend failure: {0}")]
    Backend(#[from] anyhow::Error),
}

impl LeaveError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            LeaveError::InvalidDuration(_) => "invalid_duration",
            LeaveError::QuotaExceeded { .. } => "quota_exceeded",
            LeaveError::OverlapConflict(_) => "overlap_conflict",
            LeaveError::PermissionDenied(_) => "permission_denied",
            LeaveError::VehicleUnavailable { .. } => "vehicle_unavailable",
            LeaveError::MissingReason => "missing_reason",
            LeaveError::VehicleRequired => "vehicle_required",
            LeaveError::InvalidTransition { .. } => "invalid_transition",
            LeaveError::NotFound(_) => "not_found",
            LeaveError::Backend(_) => "backend_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, LeaveError>;
