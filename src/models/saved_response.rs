use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SavedResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub tool_name: String,
    pub prompt: String,
    pub response: String,
    pub is_favorite: bool,
    pub shared_with_team: bool,
    pub public_slug: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSavedResponse {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub tool_name: String,
    pub prompt: String,
    pub response: String,
}

/// Public projection served under a share slug; no owner identifiers.
#[derive(Debug, Clone, Serialize)]
pub struct SharedResponseView {
    pub tool_name: String,
    pub prompt: String,
    pub response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<SavedResponse> for SharedResponseView {
    fn from(value: SavedResponse) -> Self {
        Self {
            tool_name: value.tool_name,
            prompt: value.prompt,
            response: value.response,
            created_at: value.created_at,
        }
    }
}
