//! # Authentication Module
//!
//! Password hashing, access token issuance/verification and the middleware
//! that turns a bearer token into a [`CurrentUser`] and enforces roles.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

use axum::response::{IntoResponse, Response};

pub use jwt::JwtService;
pub use middleware::{AuthMiddleware, RoleGuard};
pub use models::{CurrentUser, Role};

/// Authentication failures as seen from outside the auth core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Access denied")]
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        crate::error::ApiError::from(self).into_response()
    }
}
