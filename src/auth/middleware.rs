//! Authentication Middleware
//!
//! Axum middleware for bearer token validation and role enforcement.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{AuthError, jwt::JwtService, models::{CurrentUser, Role}};

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Resolve the current user from request headers.
///
/// Every failure is reported as `Unauthenticated`; the precise cause is only logged.
pub fn resolve_current_user(
    jwt_service: &JwtService,
    headers: &HeaderMap,
) -> Result<CurrentUser, AuthError> {
    let Some(token) = bearer_token(headers) else {
        tracing::debug!("missing or malformed Authorization header");
        return Err(AuthError::Unauthenticated);
    };

    match jwt_service.verify(token) {
        Ok(claims) => Ok(claims.into_current_user()),
        Err(e) => {
            tracing::warn!(reason = %e, "access token rejected");
            Err(AuthError::Unauthenticated)
        }
    }
}

/// Exact role match; admin does not satisfy an employee requirement.
pub fn authorize(user: &CurrentUser, required: Role) -> Result<(), AuthError> {
    if user.role == required {
        Ok(())
    } else {
        tracing::warn!(subject = %user.subject, role = %user.role, required = %required, "role check failed");
        Err(AuthError::Forbidden)
    }
}

/// Authentication middleware that validates bearer tokens and injects the current user
pub struct AuthMiddleware;

impl AuthMiddleware {
    pub async fn validate_token(
        State(jwt_service): State<Arc<JwtService>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, AuthError> {
        let user = resolve_current_user(&jwt_service, req.headers())?;
        tracing::debug!(subject = %user.subject, role = %user.role, "request authenticated");

        req.extensions_mut().insert(user);
        Ok(next.run(req).await)
    }
}

/// Middleware state that requires one exact role.
#[derive(Clone)]
pub struct RoleGuard {
    jwt_service: Arc<JwtService>,
    role: Role,
}

impl RoleGuard {
    pub fn require(jwt_service: Arc<JwtService>, role: Role) -> Self {
        Self { jwt_service, role }
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<CurrentUser, AuthError> {
        let user = resolve_current_user(&self.jwt_service, headers)?;
        authorize(&user, self.role)?;
        Ok(user)
    }

    pub async fn enforce(
        State(guard): State<RoleGuard>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, AuthError> {
        let user = guard.check(req.headers())?;
        req.extensions_mut().insert(user);
        Ok(next.run(req).await)
    }
}

/// Handlers behind either middleware take the resolved identity as an argument.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
