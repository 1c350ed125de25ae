use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::routes::auth::session::AuthSession;
use crate::routes::plan_limits::usage_error_response;
use crate::state::AppState;

// GET /api/usage
pub async fn usage_summary(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    match state
        .usage_gate
        .usage_summary(&claims.team_id.to_string())
        .await
    {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => usage_error_response(err),
    }
}

// GET /api/usage/{tool}
pub async fn check_tool_limit(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(tool): Path<String>,
) -> Response {
    match state
        .usage_gate
        .check_limit(&claims.team_id.to_string(), &tool)
        .await
    {
        Ok(check) => Json(check).into_response(),
        Err(err) => usage_error_response(err),
    }
}

// POST /api/usage/{tool}
pub async fn record_tool_usage(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(tool): Path<String>,
) -> Response {
    match state
        .usage_gate
        .record_usage(&claims.team_id.to_string(), &tool)
        .await
    {
        Ok(recorded) => Json(recorded).into_response(),
        Err(err) => usage_error_response(err),
    }
}
