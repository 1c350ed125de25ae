use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};

use crate::models::settings::UpdateAppSettings;
use crate::responses::JsonResponse;
use crate::routes::auth::session::{AdminSession, AuthSession};
use crate::state::AppState;

const MAX_MODEL_NAME_LEN: usize = 100;
const MAX_ANNOUNCEMENT_LEN: usize = 1_000;

// GET /api/settings
pub async fn get_settings(State(state): State<AppState>, _session: AuthSession) -> Response {
    match state.settings.get().await {
        Ok(settings) => Json(settings).into_response(),
        Err(err) => {
            error!(?err, "failed to load app settings");
            JsonResponse::server_error("Failed to load settings").into_response()
        }
    }
}

// PUT /api/admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    AdminSession(claims): AdminSession,
    Json(mut payload): Json<UpdateAppSettings>,
) -> Response {
    payload.model_name = payload.model_name.trim().to_string();
    if payload.model_name.is_empty() || payload.model_name.len() > MAX_MODEL_NAME_LEN {
        return JsonResponse::bad_request("Model name must be 1-100 characters").into_response();
    }
    payload.announcement = payload
        .announcement
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());
    if payload
        .announcement
        .as_ref()
        .is_some_and(|a| a.chars().count() > MAX_ANNOUNCEMENT_LEN)
    {
        return JsonResponse::bad_request("Announcement is too long").into_response();
    }

    match state.settings.update(&payload).await {
        Ok(settings) => {
            info!(admin_id = %claims.id, model = %settings.model_name, "app settings updated");
            Json(settings).into_response()
        }
        Err(err) => {
            error!(?err, "failed to update app settings");
            JsonResponse::server_error("Failed to update settings").into_response()
        }
    }
}
