use crate::{
    api::{leave_request, vehicle},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter allowing `requests_per_min` with an equal burst.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: Arc<Limiter>) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .configure(api_routes),
    );
}

/// Leave and vehicle endpoints, without authentication or rate limiting.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave")
            // /leave
            .service(
                web::resource("")
                    .route(web::get().to(leave_request::leave_list))
                    .route(web::post().to(leave_request::create_leave)),
            )
            // fixed segments must be registered before /leave/{id}
            .service(
                web::resource("/preview").route(web::post().to(leave_request::preview_leave)),
            )
            .service(
                web::resource("/pending").route(web::get().to(leave_request::pending_leaves)),
            )
            .service(web::resource("/quota").route(web::get().to(leave_request::leave_quota)))
            .service(web::resource("/stats").route(web::get().to(leave_request::leave_stats)))
            .service(
                web::resource("/complete").route(web::post().to(leave_request::complete_leaves)),
            )
            // /leave/{id}
            .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
            .service(
                web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)),
            )
            .service(
                web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)),
            )
            .service(
                web::resource("/{id}/cancel").route(web::put().to(leave_request::cancel_leave)),
            )
            .service(
                web::resource("/{id}/correct").route(web::put().to(leave_request::correct_leave)),
            ),
    )
    .service(
        web::scope("/vehicles").service(
            web::resource("/{id}/availability")
                .route(web::get().to(vehicle::vehicle_availability)),
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_token;
    use crate::model::employee::{Employee, EmployeeStatus};
    use crate::model::grade::Grade;
    use crate::model::leave_request::{LeaveRequest, RequestStatus};
    use crate::model::role::Role;
    use crate::models::TokenType;
    use crate::rules::policy::LeavePolicy;
    use crate::service::leave_service::LeaveService;
    use crate::store::memory::MemoryStore;
    use actix_web::{App, http::StatusCode, test, web::Data};
    use chrono::{Datelike, Duration, Local, NaiveDate};
    use serde_json::{Value, json};

    fn employee(id: u64, grade: Grade, role: Role) -> Employee {
        Employee {
            id,
            full_name: format!("員工{id}"),
            department: "業務部".into(),
            job_title: None,
            grade,
            role,
            hire_date: NaiveDate::from_ymd_opt(2015, 1, 5),
            annual_leave_quota: None,
            sick_leave_quota: None,
            personal_leave_quota: None,
            current_status: EmployeeStatus::InOffice,
            location_detail: None,
            expected_return: None,
        }
    }

    fn bearer(employee_id: u64) -> (&'static str, String) {
        let token = generate_token(
            employee_id,
            2,
            Some(employee_id),
            TokenType::Access,
            &Config::for_tests().jwt_secret,
        );
        ("Authorization", format!("Bearer {token}"))
    }

    /// A full weekday at least a week out, so "now" never falls inside it.
    fn next_weekday_window() -> (String, String) {
        let mut day = Local::now().date_naive() + Duration::days(7);
        while day.weekday().number_from_monday() > 5 {
            day += Duration::days(1);
        }
        (format!("{day}T08:00:00"), format!("{day}T17:30:00"))
    }

    macro_rules! app {
        () => {{
            let store = Arc::new(MemoryStore::with_employees(vec![
                employee(1, Grade::Ic, Role::Employee),
                employee(2, Grade::Manager, Role::Employee),
                employee(3, Grade::Ic, Role::Admin),
            ]));
            test::init_service(
                App::new()
                    .app_data(Data::new(Config::for_tests()))
                    .app_data(Data::new(LeaveService::new(store, LeavePolicy::default())))
                    .service(
                        web::scope("/api")
                            .wrap(from_fn(auth_middleware))
                            .configure(api_routes),
                    ),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn limiter_accepts_configured_rates() {
        assert!(build_limiter(1000).is_ok());
        assert!(build_limiter(0).is_ok());
    }

    #[actix_web::test]
    async fn missing_or_refresh_token_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/leave").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let refresh = generate_token(1, 2, Some(1), TokenType::Refresh, "test-secret");
        let req = test::TestRequest::get()
            .uri("/api/leave")
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "invalid_token");
    }

    #[actix_web::test]
    async fn account_without_employee_is_forbidden() {
        let app = app!();
        let token = generate_token(9, 1, None, TokenType::Access, "test-secret");
        let req = test::TestRequest::get()
            .uri("/api/leave")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "no_employee_profile");
    }

    #[actix_web::test]
    async fn submit_list_and_approve_over_http() {
        let app = app!();
        let (start, end) = next_weekday_window();

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(bearer(1))
            .set_json(json!({
                "leave_type": "annual",
                "start_time": start,
                "end_time": end,
                "reason": "family trip"
            }))
            .to_request();
        let created: LeaveRequest = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created.status, RequestStatus::PendingDept);

        let req = test::TestRequest::get()
            .uri("/api/leave")
            .insert_header(bearer(1))
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list["total"], 1);
        assert_eq!(list["data"][0]["id"], created.id);

        let req = test::TestRequest::get()
            .uri("/api/leave/pending")
            .insert_header(bearer(2))
            .to_request();
        let pending: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pending.as_array().map(Vec::len), Some(1));
        assert_eq!(pending[0]["id"], created.id);
        assert_eq!(pending[0]["overtime_warning"], false);
        assert!(pending[0]["monthly_overtime_hours"].is_null());

        let req = test::TestRequest::put()
            .uri(&format!("/api/leave/{}/approve", created.id))
            .insert_header(bearer(2))
            .set_json(json!({ "comment": "ok" }))
            .to_request();
        let approved: LeaveRequest = test::call_and_read_body_json(&app, req).await;
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.logs[1].comment.as_deref(), Some("ok"));
    }

    #[actix_web::test]
    async fn domain_errors_carry_status_and_code() {
        let app = app!();
        let (start, end) = next_weekday_window();
        let body = json!({
            "leave_type": "annual",
            "start_time": start,
            "end_time": end,
            "reason": "family trip"
        });

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(bearer(1))
            .set_json(&body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(bearer(1))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "overlap_conflict");
        assert_eq!(err["conflict"]["reason"], "family trip");

        let req = test::TestRequest::put()
            .uri("/api/leave/1/approve")
            .insert_header(bearer(1))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/leave/99")
            .insert_header(bearer(1))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(bearer(1))
            .set_json(json!({
                "leave_type": "other",
                "start_time": start,
                "end_time": end,
                "reason": ""
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "missing_reason");
    }

    #[actix_web::test]
    async fn quota_and_completion_endpoints() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/leave/quota?leave_type=sick")
            .insert_header(bearer(1))
            .to_request();
        let quota: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(quota["total"], 30.0);
        assert_eq!(quota["remaining"], 30.0);

        let req = test::TestRequest::post()
            .uri("/api/leave/complete")
            .insert_header(bearer(1))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/leave/complete")
            .insert_header(bearer(3))
            .to_request();
        let done: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(done["completed"], 0);
    }

    #[actix_web::test]
    async fn vehicle_availability_endpoint() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/vehicles/4/availability?start=2026-03-04T08:00:00&end=2026-03-04T17:30:00")
            .insert_header(bearer(1))
            .to_request();
        let availability: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(availability["available"], true);

        let req = test::TestRequest::get()
            .uri("/api/vehicles/4/availability?start=2026-03-04T17:30:00&end=2026-03-04T08:00:00")
            .insert_header(bearer(1))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
