pub mod auth;
pub mod plan_limits;
pub mod saved_responses;
pub mod settings;
pub mod stripe;
pub mod subscription;
pub mod tools;
pub mod usage;
