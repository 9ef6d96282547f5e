use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{Value, json};
use signdesk_application::MetricsView;

use crate::app::AppState;
use crate::error::ApiResult;

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Sign Language Backend API",
        "status": "running",
        "timestamp": Utc::now(),
    }))
}

pub async fn test() -> Json<Value> {
    Json(json!({
        "message": "Backend is running!",
        "timestamp": Utc::now(),
    }))
}

pub async fn global_state(State(state): State<AppState>) -> Json<MetricsView> {
    Json(state.recognition.metrics().snapshot())
}

pub async fn store_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let info = state.sessions.store().info().await?;
    Ok(Json(json!({
        "connected": info.connected,
        "backend": info.backend,
        "location": info.location,
        "degraded": info.degraded,
        "session_count": info.session_count,
        "timestamp": Utc::now(),
    })))
}

pub async fn store_sessions(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let ids = state.sessions.store().list_ids().await?;
    Ok(Json(json!({
        "count": ids.len(),
        "active_sessions": ids,
        "timestamp": Utc::now(),
    })))
}

pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Endpoint not found",
            "timestamp": Utc::now(),
        })),
    )
}
