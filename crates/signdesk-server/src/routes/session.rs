use std::net::SocketAddr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, header};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use signdesk_application::CommandResponse;
use signdesk_application::rate_limit::UNKNOWN_IDENTITY;
use signdesk_core::confirmation::WordCommand;
use signdesk_core::session::{SessionSettings, SessionState};

use super::session_id;
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

fn require_session(headers: &HeaderMap) -> ApiResult<String> {
    session_id(headers).ok_or_else(|| ApiError::input("Session ID not provided"))
}

/// A non-empty JSON object body, else "No data provided".
fn require_object(body: Result<Json<Value>, JsonRejection>) -> ApiResult<Map<String, Value>> {
    match body {
        Ok(Json(Value::Object(map))) if !map.is_empty() => Ok(map),
        _ => Err(ApiError::input("No data provided")),
    }
}

pub async fn info(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let session_id = session_id(&headers).unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
    let client_ip = peer
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN_IDENTITY);
    let session_data = state.sessions.snapshot(&session_id).await?;

    Ok(Json(json!({
        "session_id": session_id,
        "client_ip": client_ip,
        "timestamp": Utc::now(),
        "user_agent": user_agent,
        "session_data": session_data,
    })))
}

pub async fn get_data(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionState>> {
    let session_id = require_session(&headers)?;
    Ok(Json(state.sessions.snapshot(&session_id).await?))
}

pub async fn update_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let session_id = require_session(&headers)?;
    let data = require_object(body)?;
    let settings = state.sessions.update_data(&session_id, &data).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Session data updated",
        "settings": settings,
    })))
}

pub async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionSettings>> {
    let session_id = require_session(&headers)?;
    Ok(Json(state.sessions.settings(&session_id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<SessionSettings>> {
    let session_id = require_session(&headers)?;
    let patch = require_object(body)?;
    Ok(Json(state.sessions.update_settings(&session_id, &patch).await?))
}

#[derive(Debug, Deserialize)]
pub struct CommandBody {
    command: WordCommand,
}

pub async fn command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CommandBody>, JsonRejection>,
) -> ApiResult<Json<CommandResponse>> {
    let session_id = require_session(&headers)?;
    let Json(CommandBody { command }) =
        body.map_err(|e| ApiError::input(format!("Invalid command: {}", e.body_text())))?;
    Ok(Json(state.sessions.apply_command(&session_id, command).await?))
}
