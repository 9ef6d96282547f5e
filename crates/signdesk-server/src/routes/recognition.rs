use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::{Value, json};
use signdesk_application::{HealthReport, PredictRequest, PredictResponse};

use super::session_id;
use crate::app::AppState;
use crate::error::ApiResult;

/// Always 200; readiness is in the body.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.recognition.health())
}

pub async fn labels(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let labels: BTreeMap<String, String> = state
        .recognition
        .labels()?
        .into_iter()
        .map(|(index, letter)| (index.to_string(), letter.to_string()))
        .collect();
    Ok(Json(json!({
        "count": labels.len(),
        "labels": labels,
        "timestamp": Utc::now(),
    })))
}

pub async fn predict(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    // An unreadable body is reported the same way as a missing frame.
    let frame = body
        .ok()
        .and_then(|Json(body)| body.get("frame").and_then(Value::as_str).map(str::to_string));

    let request = PredictRequest {
        session_id: session_id(&headers),
        origin: peer.map(|ConnectInfo(addr)| addr.ip().to_string()),
        frame,
    };
    let response = state.recognition.predict(request).await?;
    Ok(Json(response))
}
