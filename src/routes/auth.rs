//! Auth routes for registration and login

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::models::{LoginRequest, Role, TokenResponse};
use crate::auth::password::{hash_password, verify_dummy_password, verify_password};
use crate::database::UserRecord;
use crate::error::ApiError;
use crate::routes::normalize_email;
use crate::server::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "Fuel card number is required"))]
    pub fuel_card_no: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub msg: String,
    pub id: Uuid,
}

pub async fn register(
    State(app_state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.email = normalize_email(&payload.email);
    payload.name = payload.name.trim().to_string();
    payload.fuel_card_no = payload.fuel_card_no.trim().to_string();
    payload.validate()?;

    if app_state.users.find_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    // Only the very first admin may register itself; later ones are promoted by an admin
    if payload.role == Role::Admin {
        let users = app_state.users.list_all().await?;
        if users.iter().any(|user| user.role == Role::Admin) {
            tracing::warn!(email = %payload.email, "refused admin self-registration");
            return Err(ApiError::forbidden("Only an admin can grant the admin role"));
        }
    }

    let password_hash = hash_password(&payload.password).map_err(anyhow::Error::new)?;
    let record = UserRecord::new(
        payload.email,
        payload.name,
        password_hash,
        payload.fuel_card_no,
        payload.role,
    );
    let email = record.email.clone();

    // A concurrent registration for the same email surfaces as a conflict here
    let id = app_state.users.insert(record).await?;
    tracing::info!(%email, %id, role = %payload.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            msg: "User registered successfully".to_string(),
            id,
        }),
    ))
}

pub async fn login(
    State(app_state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    let user = app_state.users.find_by_email(&payload.email).await?;

    // Unknown email and wrong password are indistinguishable to the caller
    let verified = match &user {
        Some(user) => verify_password(&payload.password, &user.password_hash),
        None => verify_dummy_password(&payload.password),
    };
    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!(email = %payload.email, "login rejected");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let ttl = app_state.jwt_service.ttl();
    let access_token = app_state
        .jwt_service
        .issue(&user.email, user.role, ttl)
        .map_err(anyhow::Error::new)?;

    tracing::info!(email = %user.email, role = %user.role, "user logged in");
    Ok(Json(TokenResponse::bearer(access_token, ttl.num_seconds())))
}
