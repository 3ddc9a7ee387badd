use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::rules::error::LeaveError;

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::InvalidDuration(_)
            | LeaveError::QuotaExceeded { .. }
            | LeaveError::MissingReason
            | LeaveError::VehicleRequired => StatusCode::BAD_REQUEST,
            LeaveError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::OverlapConflict(_)
            | LeaveError::VehicleUnavailable { .. }
            | LeaveError::InvalidTransition { .. } => StatusCode::CONFLICT,
            LeaveError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            LeaveError::Backend(e) => {
                tracing::error!(error = %e, "Leave request failed in storage");
                json!({
                    "error": self.code(),
                    "message": "Internal Server Error"
                })
            }
            LeaveError::OverlapConflict(conflict) => json!({
                "error": self.code(),
                "message": self.to_string(),
                "conflict": conflict
            }),
            LeaveError::QuotaExceeded { remaining, requested } => json!({
                "error": self.code(),
                "message": self.to_string(),
                "remaining_days": remaining,
                "requested_days": requested
            }),
            LeaveError::VehicleUnavailable { booker } => json!({
                "error": self.code(),
                "message": self.to_string(),
                "booker": booker
            }),
            _ => json!({
                "error": self.code(),
                "message": self.to_string()
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
