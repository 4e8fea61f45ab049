use axum::response::Json;
use serde_json::json;

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
/// - **Response**: `{"status":"pong"}`
///
/// Used by load balancers and container probes; does not touch the store.
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "pong" }))
}

/// API banner served at `/`.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "msg": "FuelTrackr API running" }))
}
