use async_trait::async_trait;
use sqlx::PgPool;

use super::stripe_event_log_repository::StripeEventLogRepository;

pub struct PostgresStripeEventLogRepository {
    pub pool: PgPool,
}

#[async_trait]
impl StripeEventLogRepository for PostgresStripeEventLogRepository {
    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM stripe_event_log WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn record_event(&self, event_id: &str, event_type: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO stripe_event_log (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
