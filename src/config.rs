//! Configuration module for environment variables and application settings

use std::env;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use chrono::Duration;
use jsonwebtoken::Algorithm;

/// Secret used when `JWT_SECRET` is not set. Only suitable for local development.
const DEV_JWT_SECRET: &str = "supersecret";

#[derive(Debug, Clone)]
pub struct Config {
    /// Token signing configuration
    pub jwt: JwtConfig,

    /// Database configuration, `None` selects the in-memory store
    pub database: Option<DatabaseSettings>,

    /// Server configuration
    pub server: ServerConfig,
}

/// Shared secret, algorithm and lifetime for issued access tokens.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl JwtConfig {
    /// HS256 with the default 60 minute lifetime.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            ttl: Duration::minutes(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            jwt: jwt_from_env()?,

            database: env::var("DATABASE_URL").ok().map(|url| DatabaseSettings {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(16),
            }),

            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                // $PORT wins when set by the hosting platform
                port: env::var("PORT")
                    .or_else(|_| env::var("SERVER_PORT"))
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
                allowed_origins: parse_origins(
                    &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
            },
        })
    }
}

fn jwt_from_env() -> Result<JwtConfig> {
    let secret = match env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret,
        _ => {
            tracing::warn!("JWT_SECRET is not set, falling back to the development secret");
            DEV_JWT_SECRET.to_string()
        }
    };

    let algorithm = parse_algorithm(
        &env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
    )?;

    let ttl = parse_ttl_minutes(env::var("JWT_EXPIRE_MINUTES").ok().as_deref())?;

    Ok(JwtConfig {
        secret,
        algorithm,
        ttl,
    })
}

/// Token lifetime in minutes; unset means 60.
fn parse_ttl_minutes(raw: Option<&str>) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(Duration::minutes(60));
    };
    let minutes: i64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow!("JWT_EXPIRE_MINUTES must be an integer, got {raw:?}"))?;
    if minutes <= 0 {
        bail!("JWT_EXPIRE_MINUTES must be positive, got {minutes}");
    }
    Duration::try_minutes(minutes)
        .ok_or_else(|| anyhow!("JWT_EXPIRE_MINUTES is out of range, got {minutes}"))
}

/// Only the symmetric HMAC family can be used with a shared secret.
fn parse_algorithm(raw: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(raw.trim())
        .map_err(|_| anyhow!("unknown JWT_ALGORITHM {raw:?}"))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => bail!("JWT_ALGORITHM {other:?} needs a key pair, only HS256/HS384/HS512 are supported"),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_algorithms_are_accepted() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm(" HS512 ").unwrap(), Algorithm::HS512);
    }

    #[test]
    fn asymmetric_and_unknown_algorithms_are_rejected() {
        assert!(parse_algorithm("RS256").is_err());
        assert!(parse_algorithm("none").is_err());
    }

    #[test]
    fn ttl_defaults_to_an_hour() {
        assert_eq!(parse_ttl_minutes(None).unwrap(), Duration::minutes(60));
        assert_eq!(parse_ttl_minutes(Some(" 15 ")).unwrap(), Duration::minutes(15));
    }

    #[test]
    fn ttl_rejects_non_positive_and_garbage() {
        assert!(parse_ttl_minutes(Some("0")).is_err());
        assert!(parse_ttl_minutes(Some("-5")).is_err());
        assert!(parse_ttl_minutes(Some("an hour")).is_err());
    }

    #[test]
    fn ttl_out_of_duration_range_is_an_error() {
        assert!(parse_ttl_minutes(Some("9223372036854775807")).is_err());
        assert!(parse_ttl_minutes(Some("1000000000000000")).is_err());
    }

    #[test]
    fn wildcard_origin_means_any() {
        assert!(parse_origins("*").is_empty());
        assert_eq!(
            parse_origins("http://localhost:5173, https://fueltrackr.app"),
            vec!["http://localhost:5173", "https://fueltrackr.app"]
        );
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = JwtConfig::with_secret("very-private");
        assert!(!format!("{config:?}").contains("very-private"));
    }
}
