use crate::db::{
    saved_response_repository::SavedResponseRepository,
    stripe_event_log_repository::StripeEventLogRepository,
    subscription_repository::SubscriptionRepository,
};
use crate::services::settings_cache::SettingsCache;
use crate::services::stripe::StripeService;
use crate::services::tools::ToolInvoker;
use crate::services::usage::UsageGate;
use crate::utils::jwt::SessionTokens;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub usage_gate: Arc<UsageGate>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub stripe_events: Arc<dyn StripeEventLogRepository>,
    pub saved_responses: Arc<dyn SavedResponseRepository>,
    pub settings: Arc<SettingsCache>,
    pub stripe: Arc<dyn StripeService>,
    pub tool_invoker: Arc<dyn ToolInvoker>,
    pub session_tokens: Arc<SessionTokens>,
}
