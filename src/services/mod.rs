pub mod settings_cache;
pub mod stripe;
pub mod tools;
pub mod usage;
