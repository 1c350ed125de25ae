use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::saved_response::NewSavedResponse;
use crate::models::settings::AppSettings;
use crate::models::tool::ToolName;
use crate::models::tool_output::{validate_tool_response, ToolResponse};
use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::routes::plan_limits::usage_limit_response;
use crate::services::tools::ToolInvocation;
use crate::services::usage::{LimitCheck, LimitStatus};
use crate::state::AppState;

const MAX_PROMPT_CHARS: usize = 8_000;

#[derive(Debug, Deserialize)]
pub struct RunToolRequest {
    pub prompt: String,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunToolResponse {
    pub tool: String,
    pub output: ToolResponse,
    /// Usage after this call; absent when recording failed.
    pub usage: Option<LimitCheck>,
    pub saved_response_id: Option<Uuid>,
}

// POST /api/tools/{tool}
pub async fn run_tool(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(tool): Path<String>,
    Json(payload): Json<RunToolRequest>,
) -> Response {
    let tool = match ToolName::parse(&tool) {
        Ok(tool) => tool,
        Err(err) => {
            return JsonResponse::error_with_code(
                StatusCode::BAD_REQUEST,
                &err.to_string(),
                "invalid_request",
            )
            .into_response()
        }
    };

    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return JsonResponse::bad_request("Prompt must not be empty").into_response();
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        let message = format!("Prompt exceeds {MAX_PROMPT_CHARS} characters");
        return JsonResponse::bad_request(&message).into_response();
    }

    let team_id = claims.team_id;
    let check = state
        .usage_gate
        .check_limit_at(team_id, &tool, OffsetDateTime::now_utc())
        .await;
    if !check.status.allows_call() {
        info!(%team_id, tool = %tool, used = check.used, limit = check.limit, "tool call blocked by usage gate");
        return usage_limit_response(tool.as_str(), &check);
    }
    if check.status == LimitStatus::NearLimit {
        info!(%team_id, tool = %tool, used = check.used, limit = check.limit, "team is near its tool limit");
    }

    let settings = match state.settings.get().await {
        Ok(settings) => settings,
        Err(err) => {
            warn!(?err, "settings unavailable; using defaults for tool call");
            AppSettings::default()
        }
    };

    let raw = match state
        .tool_invoker
        .invoke(ToolInvocation {
            tool: tool.clone(),
            prompt: prompt.to_string(),
            model: settings.model_name,
            team_id,
        })
        .await
    {
        Ok(raw) => raw,
        Err(err) => {
            error!(?err, %team_id, tool = %tool, "AI provider call failed");
            return JsonResponse::error_with_code(
                StatusCode::BAD_GATEWAY,
                "The AI provider could not complete this request. You were not charged a run.",
                "tool_provider_error",
            )
            .into_response();
        }
    };

    let output = match validate_tool_response(&tool, raw) {
        Ok(output) => output,
        Err(err) => {
            error!(?err, %team_id, tool = %tool, "AI provider returned an invalid tool response");
            return JsonResponse::error_with_code(
                StatusCode::BAD_GATEWAY,
                "The AI provider returned an unexpected response. You were not charged a run.",
                "tool_response_invalid",
            )
            .into_response();
        }
    };

    let usage = match state
        .usage_gate
        .record_usage_at(team_id, &tool, OffsetDateTime::now_utc())
        .await
    {
        Ok(recorded) => Some(LimitCheck {
            status: LimitStatus::evaluate(recorded.used, check.limit),
            used: recorded.used,
            limit: check.limit,
            reason: None,
            period: Some(recorded.period),
        }),
        Err(err) => {
            // Provider already answered; the output goes back unmetered.
            error!(?err, %team_id, tool = %tool, "failed to record tool usage");
            None
        }
    };

    let saved_response_id = if payload.save {
        save_output(&state, claims.id, team_id, &tool, prompt, &output).await
    } else {
        None
    };

    Json(RunToolResponse {
        tool: tool.to_string(),
        output,
        usage,
        saved_response_id,
    })
    .into_response()
}

async fn save_output(
    state: &AppState,
    user_id: Uuid,
    team_id: Uuid,
    tool: &ToolName,
    prompt: &str,
    output: &ToolResponse,
) -> Option<Uuid> {
    let response = match serde_json::to_string(output) {
        Ok(response) => response,
        Err(err) => {
            error!(?err, "failed to serialize tool output for saving");
            return None;
        }
    };
    match state
        .saved_responses
        .create_saved_response(NewSavedResponse {
            user_id,
            team_id,
            tool_name: tool.to_string(),
            prompt: prompt.to_string(),
            response,
        })
        .await
    {
        Ok(saved) => Some(saved.id),
        Err(err) => {
            error!(?err, %user_id, "failed to save tool output");
            None
        }
    }
}
