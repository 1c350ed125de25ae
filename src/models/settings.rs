use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";

/// Admin-edited, process-wide settings. Read through `SettingsCache`, never
/// held as ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AppSettings {
    pub model_name: String,
    pub announcement: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            announcement: None,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAppSettings {
    pub model_name: String,
    #[serde(default)]
    pub announcement: Option<String>,
}
