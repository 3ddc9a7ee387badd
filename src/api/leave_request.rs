use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveType, RequestStatus};
use crate::service::leave_service::{LeaveDraft, LeaveService};
use crate::store::RequestFilter;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Wall-clock time of the office; all request times are local.
fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID (admins only, others always see their own)
    pub employee_id: Option<u64>,
    #[param(value_type = Option<String>, example = "pending_dept")]
    #[schema(value_type = Option<String>, example = "pending_dept")]
    /// Filter by request status
    pub status: Option<RequestStatus>,
    /// Filter by department
    pub department: Option<String>,
    #[schema(example = 2026)]
    /// Filter by the year the request starts in
    pub year: Option<i32>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct ReviewComment {
    #[schema(example = "enjoy the trip")]
    pub comment: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CorrectLeave {
    #[schema(value_type = String, example = "2026-03-02T08:00:00")]
    pub start_time: NaiveDateTime,
    #[schema(value_type = String, example = "2026-03-02T12:15:00")]
    pub end_time: NaiveDateTime,
}

#[derive(Deserialize, IntoParams)]
pub struct QuotaQuery {
    /// Omit to get every quota-bearing type
    #[param(value_type = Option<String>, example = "annual")]
    pub leave_type: Option<LeaveType>,
}

#[derive(Deserialize, IntoParams)]
pub struct StatsQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// Managers and chiefs are limited to their own department
    pub department: Option<String>,
}

/* =========================
Submit a request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = LeaveDraft,
        description = "Leave, overtime or business-trip request",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request stored with its initial status", body = LeaveRequest),
        (status = 400, description = "Invalid duration, missing reason, missing vehicle or insufficient quota"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not eligible"),
        (status = 409, description = "Overlaps an existing request or the vehicle is taken")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<LeaveDraft>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id;
    let request = service
        .submit(employee_id, payload.into_inner(), local_now())
        .await?;
    Ok(HttpResponse::Created().json(request))
}

/* =========================
Live figures for a draft
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/preview",
    request_body(content = LeaveDraft, content_type = "application/json"),
    responses(
        (status = 200, description = "Hours, route, quota and conflicts for the draft", body = crate::service::leave_service::Preview),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn preview_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<LeaveDraft>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id;
    let preview = service.preview(employee_id, &payload, local_now()).await?;
    Ok(HttpResponse::Ok().json(preview))
}

/* =========================
Approve / reject
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body(content = ReviewComment, content_type = "application/json"),
    responses(
        (status = 200, description = "Approved, or escalated to the general manager", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to review this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewComment>>,
) -> actix_web::Result<impl Responder> {
    let approver_id = auth.employee_id;
    let comment = body.and_then(|b| b.into_inner().comment);
    let request = service
        .approve(approver_id, path.into_inner(), comment, local_now())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(content = ReviewComment, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to review this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewComment>>,
) -> actix_web::Result<impl Responder> {
    let approver_id = auth.employee_id;
    let comment = body.and_then(|b| b.into_inner().comment);
    let request = service
        .reject(approver_id, path.into_inner(), comment, local_now())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the requester, or the request already ended"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already rejected or cancelled")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee_id;
    let request = service
        .cancel(actor_id, path.into_inner(), local_now())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Admin correction of a request's time window
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/correct",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to correct")
    ),
    request_body(content = CorrectLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Window corrected and hours recomputed", body = LeaveRequest),
        (status = 400, description = "Invalid duration"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Overlap, vehicle clash or closed request")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn correct_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<CorrectLeave>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee_id;
    let request = service
        .correct(
            actor_id,
            path.into_inner(),
            payload.start_time,
            payload.end_time,
            local_now(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": "not_found",
            "message": "leave request 42 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee_id;
    let request = service.get(actor_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee_id;
    let query = query.into_inner();

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let filter = RequestFilter {
        employee_id: query.employee_id,
        status: query.status,
        department: query.department,
        year: query.year,
        limit: Some(per_page),
        offset: Some(offset),
    };
    let (data, total) = service.history(actor_id, filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Requests waiting on the caller's decision
#[utoipa::path(
    get,
    path = "/api/leave/pending",
    responses(
        (status = 200, description = "Pending requests the caller may review, with monthly overtime warnings", body = Vec<crate::service::leave_service::QueuedRequest>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_leaves(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let approver_id = auth.employee_id;
    let pending = service.pending_for(approver_id).await?;
    Ok(HttpResponse::Ok().json(pending))
}

#[utoipa::path(
    get,
    path = "/api/leave/quota",
    params(QuotaQuery),
    responses(
        (status = 200, description = "Entitlement, usage and remaining days in the current cycle", body = Vec<crate::rules::entitlement::QuotaSummary>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_quota(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<QuotaQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id;
    let today = local_now().date();
    match query.leave_type {
        Some(leave_type) => {
            let summary = service.quota(employee_id, leave_type, today).await?;
            Ok(HttpResponse::Ok().json(summary))
        }
        None => {
            let summaries = service.quotas(employee_id, today).await?;
            Ok(HttpResponse::Ok().json(summaries))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/leave/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Hours per employee and leave type", body = Vec<crate::rules::stats::EmployeeHours>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Supervisors only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_stats(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<StatsQuery>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee_id;
    let query = query.into_inner();
    let year = query.year.unwrap_or_else(|| local_now().year());
    let rows = service.yearly_stats(actor_id, year, query.department).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Marks approved requests whose end has passed as completed
#[utoipa::path(
    post,
    path = "/api/leave/complete",
    responses(
        (status = 200, description = "Number of requests completed", body = Object, example = json!({
            "completed": 3
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn complete_leaves(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let actor_id = auth.employee_id;
    let completed = service.complete_elapsed(actor_id, local_now()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "completed": completed })))
}
