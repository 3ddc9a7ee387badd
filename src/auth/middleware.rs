use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{StatusCode, header::AUTHORIZATION},
    web::Data,
};
use serde_json::json;
use thiserror::Error;

/// Why a request on the leave scope has no usable session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token: {0}")]
    InvalidToken(String),
    #[error("token carries unknown role id {0}")]
    UnknownRole(u8),
    #[error("this account is not linked to an employee")]
    NoEmployee,
    #[error("server configuration missing")]
    ConfigMissing,
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::MissingToken => "missing_token",
            SessionError::InvalidToken(_) => "invalid_token",
            SessionError::UnknownRole(_) => "invalid_role",
            SessionError::NoEmployee => "no_employee_profile",
            SessionError::ConfigMissing => "internal",
        }
    }
}

impl ResponseError for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SessionError::NoEmployee => StatusCode::FORBIDDEN,
            SessionError::ConfigMissing => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string()
        }))
    }
}

/// The employee acting on behalf of the bearer access token.
///
/// Every leave operation is performed as an employee, so accounts without a
/// linked employee record are turned away here rather than per handler.
fn resolve_session(req: &ServiceRequest) -> Result<AuthUser, SessionError> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or(SessionError::ConfigMissing)?;

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(SessionError::MissingToken)?;

    let claims = verify_token(token, &config.jwt_secret).map_err(SessionError::InvalidToken)?;
    let role = Role::from_id(claims.role).ok_or(SessionError::UnknownRole(claims.role))?;
    let employee_id = claims.employee_id.ok_or(SessionError::NoEmployee)?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id,
    })
}

/// Resolves the session and stashes it as `AuthUser` for the handlers.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let user = match resolve_session(&req) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(code = e.code(), path = %req.path(), "Request refused: {e}");
            let resp = e.error_response();
            return Ok(req.into_response(resp));
        }
    };

    tracing::debug!(
        user_id = user.user_id,
        username = %user.username,
        employee_id = user.employee_id,
        role = %user.role,
        "Session resolved"
    );
    req.extensions_mut().insert(user);

    next.call(req).await
}
