use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::saved_response::{NewSavedResponse, SavedResponse, SharedResponseView};
use crate::models::tool::ToolName;
use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::state::AppState;
use crate::utils::slug::{generate_public_slug, is_valid_public_slug};

const SLUG_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
pub struct CreateSavedResponse {
    pub tool_name: String,
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoritePayload {
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct SharePayload {
    #[serde(default)]
    pub shared_with_team: bool,
    #[serde(default)]
    pub public: bool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

// GET /api/saved-responses
pub async fn list_saved_responses(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    match state.saved_responses.list_for_user(claims.id).await {
        Ok(items) => Json(items).into_response(),
        Err(err) => {
            error!(?err, user_id = %claims.id, "failed to list saved responses");
            JsonResponse::server_error("Failed to load saved responses").into_response()
        }
    }
}

// POST /api/saved-responses
pub async fn create_saved_response(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<CreateSavedResponse>,
) -> Response {
    let tool = match ToolName::parse(&payload.tool_name) {
        Ok(tool) => tool,
        Err(err) => return JsonResponse::bad_request(&err.to_string()).into_response(),
    };
    if payload.response.trim().is_empty() {
        return JsonResponse::bad_request("Response must not be empty").into_response();
    }

    match state
        .saved_responses
        .create_saved_response(NewSavedResponse {
            user_id: claims.id,
            team_id: claims.team_id,
            tool_name: tool.to_string(),
            prompt: payload.prompt,
            response: payload.response,
        })
        .await
    {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(err) => {
            error!(?err, user_id = %claims.id, "failed to save response");
            JsonResponse::server_error("Failed to save response").into_response()
        }
    }
}

// POST /api/saved-responses/{id}/favorite
pub async fn set_favorite(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(response_id): Path<Uuid>,
    Json(payload): Json<FavoritePayload>,
) -> Response {
    match state
        .saved_responses
        .set_favorite(claims.id, response_id, payload.is_favorite)
        .await
    {
        Ok(Some(saved)) => Json(saved).into_response(),
        Ok(None) => JsonResponse::not_found("Saved response not found").into_response(),
        Err(err) => {
            error!(?err, %response_id, "failed to update favorite flag");
            JsonResponse::server_error("Failed to update saved response").into_response()
        }
    }
}

// POST /api/saved-responses/{id}/share
pub async fn set_sharing(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(response_id): Path<Uuid>,
    Json(payload): Json<SharePayload>,
) -> Response {
    let existing = match state
        .saved_responses
        .find_for_user(claims.id, response_id)
        .await
    {
        Ok(Some(existing)) => existing,
        Ok(None) => return JsonResponse::not_found("Saved response not found").into_response(),
        Err(err) => {
            error!(?err, %response_id, "failed to load saved response");
            return JsonResponse::server_error("Failed to update sharing").into_response();
        }
    };

    match apply_sharing(&state, claims.id, &existing, &payload).await {
        Ok(Some(saved)) => Json(saved).into_response(),
        Ok(None) => JsonResponse::not_found("Saved response not found").into_response(),
        Err(err) => {
            error!(?err, %response_id, "failed to update sharing");
            JsonResponse::server_error("Failed to update sharing").into_response()
        }
    }
}

/// Keeps an existing public slug; otherwise draws fresh ones until one is free.
async fn apply_sharing(
    state: &AppState,
    user_id: Uuid,
    existing: &SavedResponse,
    payload: &SharePayload,
) -> Result<Option<SavedResponse>, sqlx::Error> {
    if !payload.public {
        return state
            .saved_responses
            .set_sharing(user_id, existing.id, payload.shared_with_team, None)
            .await;
    }

    if let Some(slug) = existing.public_slug.as_deref() {
        return state
            .saved_responses
            .set_sharing(user_id, existing.id, payload.shared_with_team, Some(slug))
            .await;
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        let slug = generate_public_slug();
        match state
            .saved_responses
            .set_sharing(user_id, existing.id, payload.shared_with_team, Some(&slug))
            .await
        {
            Err(err) if is_unique_violation(&err) && attempt < SLUG_ATTEMPTS => {
                warn!(attempt, "public slug collision; drawing another");
            }
            result => return result,
        }
    }
}

// DELETE /api/saved-responses/{id}
pub async fn delete_saved_response(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(response_id): Path<Uuid>,
) -> Response {
    match state
        .saved_responses
        .delete_saved_response(claims.id, response_id)
        .await
    {
        Ok(true) => JsonResponse::success("Saved response deleted").into_response(),
        Ok(false) => JsonResponse::not_found("Saved response not found").into_response(),
        Err(err) => {
            error!(?err, %response_id, "failed to delete saved response");
            JsonResponse::server_error("Failed to delete saved response").into_response()
        }
    }
}

// GET /api/team/saved-responses
pub async fn list_team_responses(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Response {
    match state
        .saved_responses
        .list_shared_with_team(claims.team_id)
        .await
    {
        Ok(items) => Json(items).into_response(),
        Err(err) => {
            error!(?err, team_id = %claims.team_id, "failed to list team responses");
            JsonResponse::server_error("Failed to load team responses").into_response()
        }
    }
}

// GET /api/shared/{slug}
pub async fn get_shared_response(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    if !is_valid_public_slug(&slug) {
        return JsonResponse::not_found("Shared response not found").into_response();
    }
    match state.saved_responses.find_by_slug(&slug).await {
        Ok(Some(saved)) => Json(SharedResponseView::from(saved)).into_response(),
        Ok(None) => JsonResponse::not_found("Shared response not found").into_response(),
        Err(err) => {
            error!(?err, "failed to load shared response");
            JsonResponse::server_error("Failed to load shared response").into_response()
        }
    }
}
