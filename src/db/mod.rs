pub mod in_memory_usage_repository;
#[cfg(test)]
pub mod mock_db;
pub mod postgres_saved_response_repository;
pub mod postgres_settings_repository;
pub mod postgres_stripe_event_log_repository;
pub mod postgres_subscription_repository;
pub mod postgres_usage_repository;
pub mod saved_response_repository;
pub mod settings_repository;
pub mod stripe_event_log_repository;
pub mod subscription_repository;
pub mod usage_repository;
