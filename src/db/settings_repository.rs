use async_trait::async_trait;

use crate::models::settings::{AppSettings, UpdateAppSettings};

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// `None` until an admin saves settings for the first time.
    async fn get_settings(&self) -> Result<Option<AppSettings>, sqlx::Error>;

    async fn update_settings(
        &self,
        update: &UpdateAppSettings,
    ) -> Result<AppSettings, sqlx::Error>;
}
