use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::subscription::{Subscription, SubscriptionStatus};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_for_team(&self, team_id: Uuid) -> Result<Option<Subscription>, sqlx::Error>;

    async fn find_team_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error>;

    /// Replaces the team's subscription; a team never has more than one.
    /// Returns `None` when the stored row already reflects a newer Stripe
    /// event than `subscription.last_event_at`.
    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    /// `None` when the team has no subscription or a newer event was applied.
    async fn set_status(
        &self,
        team_id: Uuid,
        status: SubscriptionStatus,
        event_at: Option<OffsetDateTime>,
    ) -> Result<Option<Subscription>, sqlx::Error>;
}
