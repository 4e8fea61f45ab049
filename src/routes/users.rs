//! Profile and admin user-management routes

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{CurrentUser, Role};
use crate::database::{UserProfile, UserUpdate};
use crate::error::ApiError;
use crate::routes::normalize_email;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    fn new(msg: &str) -> Json<Self> {
        Json(Self { msg: msg.to_string() })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Fuel card number must not be empty"))]
    pub fuel_card_no: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Fuel card number must not be empty"))]
    pub fuel_card_no: Option<String>,
    pub role: Option<Role>,
}

/// Current user's profile, re-read from the store rather than the token.
pub async fn me(
    State(app_state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    let record = app_state
        .users
        .find_by_email(&user.subject)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(record.into()))
}

pub async fn update_me(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let payload = UpdateProfileRequest {
        name: trimmed(payload.name),
        fuel_card_no: trimmed(payload.fuel_card_no),
    };
    payload.validate()?;
    let update = UserUpdate {
        name: payload.name,
        fuel_card_no: payload.fuel_card_no,
        role: None,
    };
    apply_update(&app_state, &user.subject, &update).await?;

    tracing::info!(email = %user.subject, "profile updated");
    Ok(MessageResponse::new("Profile updated successfully"))
}

pub async fn list_users(State(app_state): State<AppState>) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = app_state.users.list_all().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

pub async fn admin_update_user(
    State(app_state): State<AppState>,
    admin: CurrentUser,
    Path(email): Path<String>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let payload = AdminUpdateUserRequest {
        name: trimmed(payload.name),
        fuel_card_no: trimmed(payload.fuel_card_no),
        ..payload
    };
    payload.validate()?;
    let email = normalize_email(&email);
    let update = UserUpdate {
        name: payload.name,
        fuel_card_no: payload.fuel_card_no,
        role: payload.role,
    };
    apply_update(&app_state, &email, &update).await?;

    tracing::info!(admin = %admin.subject, target = %email, role = ?update.role, "user updated by admin");
    Ok(MessageResponse::new("User updated successfully"))
}

pub async fn delete_user(
    State(app_state): State<AppState>,
    admin: CurrentUser,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&email);
    ensure_not_self(&admin, &email)?;

    if app_state.users.delete(&email).await? == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(admin = %admin.subject, target = %email, "user deleted");
    Ok(MessageResponse::new("User deleted successfully"))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}

/// An admin may not delete the account they are authenticated as.
fn ensure_not_self(admin: &CurrentUser, target: &str) -> Result<(), ApiError> {
    if admin.subject == target {
        tracing::warn!(admin = %admin.subject, "refused self-delete");
        return Err(ApiError::forbidden("Admins cannot delete their own account"));
    }
    Ok(())
}

/// Partial update where "nothing changed" is an error, even when the
/// submitted values equal the stored ones.
async fn apply_update(app_state: &AppState, email: &str, update: &UserUpdate) -> Result<(), ApiError> {
    if app_state.users.find_by_email(email).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    if app_state.users.update(email, update).await? == 0 {
        return Err(ApiError::bad_request("No changes made"));
    }
    Ok(())
}
