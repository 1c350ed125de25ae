use async_trait::async_trait;

/// Stripe event ids whose effects are already stored.
#[async_trait]
pub trait StripeEventLogRepository: Send + Sync {
    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error>;

    async fn record_event(&self, event_id: &str, event_type: &str) -> Result<(), sqlx::Error>;
}
