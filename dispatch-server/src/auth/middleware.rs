//! Authentication and role middleware
//!
//! `require_auth` validates the bearer token on every `/api/` request and
//! stores the [`CurrentUser`] in request extensions; `require_role` then
//! gates whole route groups by role.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::job::Role;

use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS || !req.uri().path().starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::not_authenticated());
        }
    };

    match state.jwt_service().validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::try_from(claims)
                .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {}", e)))?;
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );

            match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}

/// Reject callers whose role is not in `roles`
pub fn require_role(
    roles: &'static [Role],
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
+ Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or_else(AppError::not_authenticated)?;

            if !roles.contains(&user.role) {
                security_log!(
                    "WARN",
                    "role_denied",
                    user_id = user.id.clone(),
                    user_role = user.role.as_str(),
                    uri = format!("{:?}", req.uri())
                );
                return Err(AppError::with_message(
                    shared::ErrorCode::RoleRequired,
                    format!("Requires role: {}", role_list(roles)),
                ));
            }

            Ok(next.run(req).await)
        })
    }
}

fn role_list(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

pub const CUSTOMER: &[Role] = &[Role::Customer];
pub const TECHNICIAN: &[Role] = &[Role::Technician];
pub const OPERATOR: &[Role] = &[Role::Operator];
pub const FIELD_STAFF: &[Role] = &[Role::Technician, Role::Operator];
pub const ANY_ROLE: &[Role] = &[Role::Customer, Role::Technician, Role::Operator];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_list() {
        assert_eq!(role_list(FIELD_STAFF), "technician or operator");
        assert_eq!(role_list(CUSTOMER), "customer");
    }
}
