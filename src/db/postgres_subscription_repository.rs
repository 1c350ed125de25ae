use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::subscription::{Subscription, SubscriptionStatus};

use super::subscription_repository::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_for_team(&self, team_id: Uuid) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT team_id, plan, status, renewal_anchor, trial_end, cancel_at_period_end,
                   stripe_customer_id, stripe_subscription_id, updated_at, last_event_at
            FROM team_subscriptions
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_team_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT team_id
            FROM team_subscriptions
            WHERE stripe_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO team_subscriptions (
                team_id, plan, status, renewal_anchor, trial_end, cancel_at_period_end,
                stripe_customer_id, stripe_subscription_id, updated_at, last_event_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), $9)
            ON CONFLICT (team_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                renewal_anchor = EXCLUDED.renewal_anchor,
                trial_end = EXCLUDED.trial_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                stripe_customer_id = COALESCE(EXCLUDED.stripe_customer_id, team_subscriptions.stripe_customer_id),
                stripe_subscription_id = COALESCE(EXCLUDED.stripe_subscription_id, team_subscriptions.stripe_subscription_id),
                updated_at = now(),
                last_event_at = COALESCE(EXCLUDED.last_event_at, team_subscriptions.last_event_at)
            WHERE team_subscriptions.last_event_at IS NULL
               OR EXCLUDED.last_event_at IS NULL
               OR team_subscriptions.last_event_at <= EXCLUDED.last_event_at
            RETURNING team_id, plan, status, renewal_anchor, trial_end, cancel_at_period_end,
                      stripe_customer_id, stripe_subscription_id, updated_at, last_event_at
            "#,
        )
        .bind(subscription.team_id)
        .bind(&subscription.plan)
        .bind(subscription.status)
        .bind(subscription.renewal_anchor)
        .bind(subscription.trial_end)
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.stripe_customer_id.as_deref())
        .bind(subscription.stripe_subscription_id.as_deref())
        .bind(subscription.last_event_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_status(
        &self,
        team_id: Uuid,
        status: SubscriptionStatus,
        event_at: Option<OffsetDateTime>,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE team_subscriptions
            SET status = $2,
                updated_at = now(),
                last_event_at = COALESCE($3, last_event_at)
            WHERE team_id = $1
              AND ($3::timestamptz IS NULL OR last_event_at IS NULL OR last_event_at <= $3)
            RETURNING team_id, plan, status, renewal_anchor, trial_end, cancel_at_period_end,
                      stripe_customer_id, stripe_subscription_id, updated_at, last_event_at
            "#,
        )
        .bind(team_id)
        .bind(status)
        .bind(event_at)
        .fetch_optional(&self.pool)
        .await
    }
}
