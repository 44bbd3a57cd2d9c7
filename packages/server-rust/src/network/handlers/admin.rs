//! Runtime log level administration.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::network::error::ApiError;
use crate::telemetry::LogLevel;

#[derive(Debug, Deserialize)]
pub struct SetLevelParams {
    pub level: Option<String>,
}

/// `GET /admin/log` -> `{"level": "<LEVEL>"}`.
pub async fn get_log_level_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "level": state.log.level().as_str() }))
}

/// `PUT /admin/log?level=<LEVEL>`. Accepts FATAL, ERROR, WARNING (or WARN),
/// INFO and DEBUG, case-insensitively.
pub async fn set_log_level_handler(
    State(state): State<AppState>,
    Query(params): Query<SetLevelParams>,
) -> Result<StatusCode, ApiError> {
    let raw = params.level.unwrap_or_default();
    let level: LogLevel = raw.parse().map_err(|_| ApiError::InvalidLogLevel(raw))?;
    state
        .log
        .set_level(level)
        .map_err(|e| ApiError::LogControl(e.to_string()))?;
    info!(level = %level, "log level changed");
    Ok(StatusCode::OK)
}
