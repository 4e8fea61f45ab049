//! Authentication Models
//!
//! Roles, the authenticated identity and the login request/response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User role. There is no hierarchy: each guarded endpoint names exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role value. Matching is exact.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(Role::Employee),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity reconstructed from a verified access token.
///
/// This is the canonical "current user" for the rest of request handling.
/// It reflects the user record at issuance time; handlers needing fresh
/// profile data must query the store by `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    /// User email
    pub subject: String,
    pub role: Role,
    pub expiry: DateTime<Utc>,
}

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token response after successful authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let parsed: Role = serde_json::from_str("\"employee\"").unwrap();
        assert_eq!(parsed, Role::Employee);
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse("manager"), None);
        assert!(serde_json::from_str::<Role>("\"manager\"").is_err());
    }

    #[test]
    fn login_request_requires_valid_email() {
        let req = LoginRequest {
            email: "not-an-email".into(),
            password: "pw".into(),
        };
        assert!(req.validate().is_err());
    }
}
