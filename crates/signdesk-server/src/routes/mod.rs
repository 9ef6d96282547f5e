//! HTTP surface.

mod recognition;
mod session;
mod status;

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::{get, post};

use crate::app::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status::index))
        .route("/api/test", get(status::test))
        .route("/api/health", get(recognition::health))
        .route("/api/labels", get(recognition::labels))
        .route("/api/predict", post(recognition::predict))
        .route("/api/global-state", get(status::global_state))
        .route("/api/store/info", get(status::store_info))
        .route("/api/store/sessions", get(status::store_sessions))
        .route("/api/session", get(session::info))
        .route(
            "/api/session/data",
            get(session::get_data).post(session::update_data),
        )
        .route(
            "/api/session/settings",
            get(session::get_settings).put(session::update_settings),
        )
        .route("/api/session/command", post(session::command))
        .fallback(status::not_found)
        .with_state(state)
}

/// The `X-Session-ID` header, if present and non-empty.
fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
