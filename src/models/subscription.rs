use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::plan::PLAN_FREE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_status")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Failed,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Failed => "failed",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Maps a Stripe subscription status onto ours.
    pub fn from_stripe(status: &str) -> Option<Self> {
        match status.trim().to_lowercase().as_str() {
            "trialing" => Some(SubscriptionStatus::Trial),
            "active" => Some(SubscriptionStatus::Active),
            "past_due" | "unpaid" | "incomplete" => Some(SubscriptionStatus::Failed),
            "canceled" | "incomplete_expired" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub team_id: Uuid,
    /// Raw plan identifier as stored; the plan catalog decides whether it is known.
    pub plan: String,
    pub status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub renewal_anchor: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_end: Option<OffsetDateTime>,
    pub cancel_at_period_end: bool,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// `created` of the newest Stripe event applied to this row.
    #[serde(skip)]
    pub last_event_at: Option<OffsetDateTime>,
}

impl Subscription {
    /// The plan usage is metered against at `now`. Canceled subscriptions and
    /// lapsed trials meter as free; a failed payment keeps its plan.
    pub fn effective_plan(&self, now: OffsetDateTime) -> &str {
        match self.status {
            SubscriptionStatus::Canceled => PLAN_FREE,
            SubscriptionStatus::Trial if self.trial_end.is_some_and(|end| end <= now) => PLAN_FREE,
            _ => self.plan.as_str(),
        }
    }

    /// True when a Stripe event created after `event_at` was already applied.
    /// Events without a timestamp are never considered stale.
    pub fn has_newer_event_than(&self, event_at: Option<OffsetDateTime>) -> bool {
        match (self.last_event_at, event_at) {
            (Some(seen), Some(at)) => seen > at,
            _ => false,
        }
    }
}
