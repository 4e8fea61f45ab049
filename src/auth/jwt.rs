//! JWT Token Service
//!
//! Issues and verifies the signed, time-limited access tokens that carry a
//! user's email and role.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::auth::models::{CurrentUser, Role};
use crate::config::JwtConfig;

/// JWT Claims structure as it appears on the wire
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User email
    pub sub: String,
    pub role: Role,
    /// Token expiration timestamp (unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn into_current_user(self) -> CurrentUser {
        CurrentUser {
            expiry: DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC),
            subject: self.sub,
            role: self.role,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is checked by `verify_at` against an explicit clock, with no leeway.
        let mut validation = Validation::new(config.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            encoding_key,
            decoding_key,
            header: Header::new(config.algorithm),
            validation,
            ttl: config.ttl,
        }
    }

    /// Configured lifetime for tokens issued at login.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: &str, role: Role, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject, role, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        role: Role,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expiry = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encoding(format!("expiry out of range for ttl {ttl}")))?;
        let claims = Claims {
            sub: subject.to_string(),
            role,
            exp: expiry.timestamp(),
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims unchanged.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;

        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;

    fn service() -> JwtService {
        JwtService::new(&JwtConfig::with_secret("test_secret"))
    }

    #[test]
    fn test_jwt_roundtrip() {
        let jwt_service = service();
        let token = jwt_service
            .issue("a@x.com", Role::Employee, Duration::minutes(60))
            .unwrap();

        let claims = jwt_service.verify(&token).unwrap();

        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.role, Role::Employee);
    }

    #[test]
    fn ttl_past_the_calendar_is_an_encoding_error() {
        let jwt_service = service();
        let result = jwt_service.issue_at(
            "a@x.com",
            Role::Employee,
            Duration::minutes(1_000_000_000_000),
            Utc::now(),
        );
        assert!(matches!(result, Err(TokenError::Encoding(_))));
    }

    #[test]
    fn expiry_is_issue_time_plus_ttl() {
        let jwt_service = service();
        let now = Utc::now();
        let token = jwt_service
            .issue_at("a@x.com", Role::Admin, Duration::minutes(5), now)
            .unwrap();

        let claims = jwt_service.verify_at(&token, now).unwrap();
        assert_eq!(claims.exp, (now + Duration::minutes(5)).timestamp());

        let user = claims.into_current_user();
        assert_eq!(user.subject, "a@x.com");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.expiry.timestamp(), (now + Duration::minutes(5)).timestamp());
    }

    #[test]
    fn token_expires_once_ttl_has_elapsed() {
        let jwt_service = service();
        let now = Utc::now();
        let ttl = Duration::minutes(60);
        let token = jwt_service.issue_at("a@x.com", Role::Employee, ttl, now).unwrap();

        assert!(jwt_service.verify_at(&token, now + ttl - Duration::seconds(1)).is_ok());
        assert_eq!(jwt_service.verify_at(&token, now + ttl), Err(TokenError::Expired));
        assert_eq!(
            jwt_service.verify_at(&token, now + ttl + Duration::hours(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn token_issued_in_the_past_is_rejected_now() {
        let jwt_service = service();
        let token = jwt_service
            .issue_at("a@x.com", Role::Employee, Duration::minutes(1), Utc::now() - Duration::hours(2))
            .unwrap();
        assert_eq!(jwt_service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn altered_signature_is_rejected() {
        let jwt_service = service();
        let token = jwt_service
            .issue("a@x.com", Role::Employee, Duration::minutes(60))
            .unwrap();

        let signature_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[signature_start] = if bytes[signature_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(jwt_service.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn altered_payload_is_rejected() {
        let jwt_service = service();
        let employee = jwt_service
            .issue("a@x.com", Role::Employee, Duration::minutes(60))
            .unwrap();
        let admin = jwt_service
            .issue("a@x.com", Role::Admin, Duration::minutes(60))
            .unwrap();

        // Splice the admin payload onto the employee signature
        let employee_parts: Vec<&str> = employee.split('.').collect();
        let admin_parts: Vec<&str> = admin.split('.').collect();
        let forged = format!("{}.{}.{}", employee_parts[0], admin_parts[1], employee_parts[2]);

        assert_eq!(jwt_service.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = JwtService::new(&JwtConfig::with_secret("other_secret"));
        let token = other
            .issue("a@x.com", Role::Admin, Duration::minutes(60))
            .unwrap();
        assert_eq!(service().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn token_with_another_algorithm_is_rejected() {
        let mut config = JwtConfig::with_secret("test_secret");
        config.algorithm = Algorithm::HS512;
        let token = JwtService::new(&config)
            .issue("a@x.com", Role::Admin, Duration::minutes(60))
            .unwrap();
        assert_eq!(service().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let jwt_service = service();
        assert_eq!(jwt_service.verify(""), Err(TokenError::Malformed));
        assert_eq!(jwt_service.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(jwt_service.verify("a.b.c"), Err(TokenError::Malformed));
    }
}
