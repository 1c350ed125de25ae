use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use super::in_memory_usage_repository::InMemoryUsageLedger;
use super::saved_response_repository::SavedResponseRepository;
use super::settings_repository::SettingsRepository;
use super::stripe_event_log_repository::StripeEventLogRepository;
use super::subscription_repository::SubscriptionRepository;
use super::usage_repository::UsageLedger;
use crate::models::saved_response::{NewSavedResponse, SavedResponse};
use crate::models::settings::{AppSettings, UpdateAppSettings};
use crate::models::subscription::{Subscription, SubscriptionStatus};
use crate::models::usage::{UsagePeriod, UsageRecord};
use crate::services::usage::plan_catalog::PlanCatalog;
use crate::services::usage::UsageError;

/// Database error carrying a Postgres SQLSTATE, for exercising conflict and
/// unique-violation handling without a live database.
#[derive(Debug)]
pub struct TestDatabaseError {
    code: &'static str,
    unique: bool,
}

impl TestDatabaseError {
    pub fn serialization_failure() -> sqlx::Error {
        sqlx::Error::Database(Box::new(Self {
            code: "40001",
            unique: false,
        }))
    }

    pub fn unique_violation() -> sqlx::Error {
        sqlx::Error::Database(Box::new(Self {
            code: "23505",
            unique: true,
        }))
    }
}

impl std::fmt::Display for TestDatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "test database error {}", self.code)
    }
}

impl std::error::Error for TestDatabaseError {}

impl sqlx::error::DatabaseError for TestDatabaseError {
    fn message(&self) -> &str {
        "test database error"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        if self.unique {
            sqlx::error::ErrorKind::UniqueViolation
        } else {
            sqlx::error::ErrorKind::Other
        }
    }
}

#[derive(Default)]
pub struct StaticSubscriptionRepository {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
    pub customers: Mutex<HashMap<String, Uuid>>,
    pub should_fail: bool,
}

impl StaticSubscriptionRepository {
    pub fn with_subscription(subscription: Subscription) -> Self {
        let repo = Self::default();
        if let Some(customer) = subscription.stripe_customer_id.clone() {
            repo.customers
                .lock()
                .unwrap()
                .insert(customer, subscription.team_id);
        }
        repo.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.team_id, subscription);
        repo
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn get(&self, team_id: Uuid) -> Option<Subscription> {
        self.subscriptions.lock().unwrap().get(&team_id).cloned()
    }
}

#[async_trait]
impl SubscriptionRepository for StaticSubscriptionRepository {
    async fn find_for_team(&self, team_id: Uuid) -> Result<Option<Subscription>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.get(team_id))
    }

    async fn find_team_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.customers.lock().unwrap().get(customer_id).copied())
    }

    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut stored = subscription.clone();
        stored.updated_at = OffsetDateTime::now_utc();
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(existing) = subscriptions.get(&subscription.team_id) {
            if existing.has_newer_event_than(subscription.last_event_at) {
                return Ok(None);
            }
            stored.last_event_at = stored.last_event_at.or(existing.last_event_at);
            if stored.stripe_customer_id.is_none() {
                stored.stripe_customer_id = existing.stripe_customer_id.clone();
            }
            if stored.stripe_subscription_id.is_none() {
                stored.stripe_subscription_id = existing.stripe_subscription_id.clone();
            }
        }
        if let Some(customer) = stored.stripe_customer_id.clone() {
            self.customers
                .lock()
                .unwrap()
                .insert(customer, stored.team_id);
        }
        subscriptions.insert(stored.team_id, stored.clone());
        Ok(Some(stored))
    }

    async fn set_status(
        &self,
        team_id: Uuid,
        status: SubscriptionStatus,
        event_at: Option<OffsetDateTime>,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut subscriptions = self.subscriptions.lock().unwrap();
        Ok(subscriptions
            .get_mut(&team_id)
            .filter(|sub| !sub.has_newer_event_than(event_at))
            .map(|sub| {
                sub.status = status;
                sub.updated_at = OffsetDateTime::now_utc();
                sub.last_event_at = event_at.or(sub.last_event_at);
                sub.clone()
            }))
    }
}

/// Event log keeping processed ids in memory.
#[derive(Default)]
pub struct InMemoryStripeEventLog {
    pub events: Mutex<HashMap<String, String>>,
    pub should_fail: bool,
}

impl InMemoryStripeEventLog {
    pub fn contains(&self, event_id: &str) -> bool {
        self.events.lock().unwrap().contains_key(event_id)
    }
}

#[async_trait]
impl StripeEventLogRepository for InMemoryStripeEventLog {
    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.contains(event_id))
    }

    async fn record_event(&self, event_id: &str, event_type: &str) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.events
            .lock()
            .unwrap()
            .entry(event_id.to_string())
            .or_insert_with(|| event_type.to_string());
        Ok(())
    }
}

/// Ledger whose backend is down.
pub struct UnavailableUsageLedger;

#[async_trait]
impl UsageLedger for UnavailableUsageLedger {
    async fn count_for(&self, _: Uuid, _: &str, _: &UsagePeriod) -> Result<i64, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn increment(&self, _: Uuid, _: &str, _: &UsagePeriod) -> Result<i64, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn usage_for_period(
        &self,
        _: Uuid,
        _: &UsagePeriod,
    ) -> Result<Vec<UsageRecord>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }
}

/// Ledger that answers after `delay`.
pub struct SlowUsageLedger {
    pub delay: Duration,
    pub inner: InMemoryUsageLedger,
}

#[async_trait]
impl UsageLedger for SlowUsageLedger {
    async fn count_for(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.count_for(team_id, tool_name, period).await
    }

    async fn increment(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.increment(team_id, tool_name, period).await
    }

    async fn usage_for_period(
        &self,
        team_id: Uuid,
        period: &UsagePeriod,
    ) -> Result<Vec<UsageRecord>, sqlx::Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.usage_for_period(team_id, period).await
    }
}

/// Ledger reporting a fixed count for every key.
pub struct FixedCountLedger(pub i64);

#[async_trait]
impl UsageLedger for FixedCountLedger {
    async fn count_for(&self, _: Uuid, _: &str, _: &UsagePeriod) -> Result<i64, sqlx::Error> {
        Ok(self.0)
    }

    async fn increment(&self, _: Uuid, _: &str, _: &UsagePeriod) -> Result<i64, sqlx::Error> {
        Ok(self.0 + 1)
    }

    async fn usage_for_period(
        &self,
        _: Uuid,
        _: &UsagePeriod,
    ) -> Result<Vec<UsageRecord>, sqlx::Error> {
        Ok(Vec::new())
    }
}

/// Fails the first `conflicts` increments with a serialization failure, then
/// delegates to an in-memory ledger.
pub struct ConflictingUsageLedger {
    pub conflicts: usize,
    pub attempts: AtomicUsize,
    pub inner: InMemoryUsageLedger,
}

impl ConflictingUsageLedger {
    pub fn new(conflicts: usize) -> Self {
        Self {
            conflicts,
            attempts: AtomicUsize::new(0),
            inner: InMemoryUsageLedger::new(),
        }
    }
}

#[async_trait]
impl UsageLedger for ConflictingUsageLedger {
    async fn count_for(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        self.inner.count_for(team_id, tool_name, period).await
    }

    async fn increment(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.conflicts {
            return Err(TestDatabaseError::serialization_failure());
        }
        self.inner.increment(team_id, tool_name, period).await
    }

    async fn usage_for_period(
        &self,
        team_id: Uuid,
        period: &UsagePeriod,
    ) -> Result<Vec<UsageRecord>, sqlx::Error> {
        self.inner.usage_for_period(team_id, period).await
    }
}

/// Catalog source that cannot be reached.
pub struct UnavailablePlanCatalog;

#[async_trait]
impl PlanCatalog for UnavailablePlanCatalog {
    async fn limit_for(&self, _plan: &str, _tool: &str) -> Result<i64, UsageError> {
        Err(UsageError::Unavailable("plan catalog offline".into()))
    }

    async fn tools(&self) -> Result<Vec<String>, UsageError> {
        Err(UsageError::Unavailable("plan catalog offline".into()))
    }
}

#[derive(Default)]
pub struct InMemorySavedResponseRepository {
    pub responses: Mutex<Vec<SavedResponse>>,
}

#[async_trait]
impl SavedResponseRepository for InMemorySavedResponseRepository {
    async fn create_saved_response(
        &self,
        new_response: NewSavedResponse,
    ) -> Result<SavedResponse, sqlx::Error> {
        let saved = SavedResponse {
            id: Uuid::new_v4(),
            user_id: new_response.user_id,
            team_id: new_response.team_id,
            tool_name: new_response.tool_name,
            prompt: new_response.prompt,
            response: new_response.response,
            is_favorite: false,
            shared_with_team: false,
            public_slug: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.responses.lock().unwrap().push(saved.clone());
        Ok(saved)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SavedResponse>, sqlx::Error> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_shared_with_team(
        &self,
        team_id: Uuid,
    ) -> Result<Vec<SavedResponse>, sqlx::Error> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.team_id == team_id && r.shared_with_team)
            .cloned()
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<SavedResponse>, sqlx::Error> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.public_slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn set_favorite(
        &self,
        user_id: Uuid,
        response_id: Uuid,
        is_favorite: bool,
    ) -> Result<Option<SavedResponse>, sqlx::Error> {
        let mut responses = self.responses.lock().unwrap();
        Ok(responses
            .iter_mut()
            .find(|r| r.id == response_id && r.user_id == user_id)
            .map(|r| {
                r.is_favorite = is_favorite;
                r.clone()
            }))
    }

    async fn set_sharing(
        &self,
        user_id: Uuid,
        response_id: Uuid,
        shared_with_team: bool,
        public_slug: Option<&str>,
    ) -> Result<Option<SavedResponse>, sqlx::Error> {
        let mut responses = self.responses.lock().unwrap();
        if let Some(slug) = public_slug {
            let taken = responses
                .iter()
                .any(|r| r.id != response_id && r.public_slug.as_deref() == Some(slug));
            if taken {
                return Err(TestDatabaseError::unique_violation());
            }
        }
        Ok(responses
            .iter_mut()
            .find(|r| r.id == response_id && r.user_id == user_id)
            .map(|r| {
                r.shared_with_team = shared_with_team;
                r.public_slug = public_slug.map(str::to_string);
                r.clone()
            }))
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        response_id: Uuid,
    ) -> Result<Option<SavedResponse>, sqlx::Error> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == response_id && r.user_id == user_id)
            .cloned())
    }

    async fn delete_saved_response(
        &self,
        user_id: Uuid,
        response_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut responses = self.responses.lock().unwrap();
        let before = responses.len();
        responses.retain(|r| !(r.id == response_id && r.user_id == user_id));
        Ok(responses.len() != before)
    }
}

#[derive(Default)]
pub struct InMemorySettingsRepository {
    pub settings: Mutex<Option<AppSettings>>,
    pub reads: Arc<AtomicUsize>,
    pub should_fail: bool,
}

impl InMemorySettingsRepository {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get_settings(&self) -> Result<Option<AppSettings>, sqlx::Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn update_settings(
        &self,
        update: &UpdateAppSettings,
    ) -> Result<AppSettings, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let settings = AppSettings {
            model_name: update.model_name.clone(),
            announcement: update.announcement.clone(),
            updated_at: OffsetDateTime::now_utc(),
        };
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(settings)
    }
}
