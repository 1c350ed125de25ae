use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::settings::{AppSettings, UpdateAppSettings};

use super::settings_repository::SettingsRepository;

pub struct PostgresSettingsRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    async fn get_settings(&self) -> Result<Option<AppSettings>, sqlx::Error> {
        sqlx::query_as::<_, AppSettings>(
            r#"
            SELECT model_name, announcement, updated_at
            FROM app_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_settings(
        &self,
        update: &UpdateAppSettings,
    ) -> Result<AppSettings, sqlx::Error> {
        sqlx::query_as::<_, AppSettings>(
            r#"
            INSERT INTO app_settings (id, model_name, announcement, updated_at)
            VALUES (1, $1, $2, now())
            ON CONFLICT (id) DO UPDATE SET
                model_name = EXCLUDED.model_name,
                announcement = EXCLUDED.announcement,
                updated_at = now()
            RETURNING model_name, announcement, updated_at
            "#,
        )
        .bind(&update.model_name)
        .bind(update.announcement.as_deref())
        .fetch_one(&self.pool)
        .await
    }
}
