//! Travel log routes

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::database::{NewTravelLog, TravelLog};
use crate::error::ApiError;
use crate::routes::normalize_email;
use crate::server::AppState;

/// Logs returned for the caller's own history
const OWN_LOG_LIMIT: usize = 100;
/// Logs returned on admin listings
const ADMIN_LOG_LIMIT: usize = 1000;

#[derive(Debug, Deserialize, Validate)]
pub struct AddTravelRequest {
    /// Defaults to the time of the request
    pub date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, message = "meter_start must not be negative"))]
    pub meter_start: f64,
    #[validate(range(min = 0.0, message = "meter_end must not be negative"))]
    pub meter_end: f64,
    #[validate(range(min = 0.0, message = "official_km must not be negative"))]
    pub official_km: f64,
    #[validate(range(min = 0.0, message = "private_km must not be negative"))]
    pub private_km: f64,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddTravelResponse {
    pub msg: String,
    pub id: Uuid,
}

pub async fn add_travel(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<AddTravelRequest>,
) -> Result<(StatusCode, Json<AddTravelResponse>), ApiError> {
    payload.validate()?;
    if payload.meter_end < payload.meter_start {
        return Err(ApiError::bad_request("meter_end must not be less than meter_start"));
    }

    let log = TravelLog::new(NewTravelLog {
        user_email: user.subject.clone(),
        date: payload.date.unwrap_or_else(Utc::now),
        meter_start: payload.meter_start,
        meter_end: payload.meter_end,
        official_km: payload.official_km,
        private_km: payload.private_km,
        remarks: payload.remarks.unwrap_or_default(),
    });
    let total_km = log.total_km;
    let id = app_state.travels.insert_travel(log).await?;

    tracing::info!(email = %user.subject, %id, total_km, "travel log added");
    Ok((
        StatusCode::CREATED,
        Json(AddTravelResponse {
            msg: "Travel log added".to_string(),
            id,
        }),
    ))
}

pub async fn my_travels(
    State(app_state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<TravelLog>>, ApiError> {
    let logs = app_state
        .travels
        .travels_by_user(&user.subject, OWN_LOG_LIMIT)
        .await?;
    Ok(Json(logs))
}

pub async fn all_travels(State(app_state): State<AppState>) -> Result<Json<Vec<TravelLog>>, ApiError> {
    Ok(Json(app_state.travels.all_travels(ADMIN_LOG_LIMIT).await?))
}

pub async fn user_travels(
    State(app_state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<TravelLog>>, ApiError> {
    let email = normalize_email(&email);
    let logs = app_state
        .travels
        .travels_by_user(&email, ADMIN_LOG_LIMIT)
        .await?;
    Ok(Json(logs))
}
