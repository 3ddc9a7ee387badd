use crate::auth::auth::AuthUser;
use crate::service::leave_service::LeaveService;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    #[param(value_type = String, example = "2026-03-04T08:00:00")]
    pub start: NaiveDateTime,
    #[param(value_type = String, example = "2026-03-04T17:30:00")]
    pub end: NaiveDateTime,
}

/// Whether a company car is free for a window, and who holds it if not
#[utoipa::path(
    get,
    path = "/api/vehicles/{vehicle_id}/availability",
    params(
        ("vehicle_id" = u64, Path, description = "Company car ID"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Availability of the vehicle", body = crate::service::leave_service::VehicleAvailability),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Vehicle"
)]
pub async fn vehicle_availability(
    _auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    query: web::Query<AvailabilityQuery>,
) -> actix_web::Result<impl Responder> {
    if query.start >= query.end {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "invalid_duration",
            "message": "start must be before end"
        })));
    }
    let availability = service
        .vehicle_availability(path.into_inner(), query.start, query.end)
        .await?;
    Ok(HttpResponse::Ok().json(availability))
}
