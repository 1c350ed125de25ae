use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 2000;
const DEFAULT_SETTINGS_CACHE_SECONDS: u64 = 30;
const DEFAULT_RATE_LIMIT_MS: u64 = 200;
const DEFAULT_RATE_LIMIT_BURST: u32 = 20;
const DEFAULT_TOOL_RATE_LIMIT_SECONDS: u64 = 2;
const DEFAULT_TOOL_RATE_LIMIT_BURST: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct AiUpstreamSettings {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct UsageSettings {
    /// Built-in limits are used when unset.
    pub plan_limits_path: Option<PathBuf>,
    pub lookup_timeout: Duration,
    pub ledger_backend: LedgerBackend,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub global_per_millisecond: u64,
    pub global_burst: u32,
    pub tools_per_second: u64,
    pub tools_burst: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub stripe: StripeSettings,
    pub ai_upstream: AiUpstreamSettings,
    pub usage: UsageSettings,
    pub settings_cache_ttl: Duration,
    pub rate_limit: RateLimitSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let ledger_backend = match lookup("USAGE_LEDGER_BACKEND").as_deref() {
            None | Some("postgres") => LedgerBackend::Postgres,
            Some("memory") => LedgerBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "USAGE_LEDGER_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            frontend_origin: required("FRONTEND_ORIGIN")?,
            jwt_issuer: required("JWT_ISSUER")?,
            jwt_audience: required("JWT_AUDIENCE")?,
            stripe: StripeSettings {
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            },
            ai_upstream: AiUpstreamSettings {
                url: required("AI_UPSTREAM_URL")?,
                api_key: required("AI_UPSTREAM_API_KEY")?,
            },
            usage: UsageSettings {
                plan_limits_path: lookup("PLAN_LIMITS_PATH")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from),
                lookup_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "USAGE_LOOKUP_TIMEOUT_MS",
                    DEFAULT_LOOKUP_TIMEOUT_MS,
                )?),
                ledger_backend,
            },
            settings_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SETTINGS_CACHE_SECONDS",
                DEFAULT_SETTINGS_CACHE_SECONDS,
            )?),
            rate_limit: RateLimitSettings {
                global_per_millisecond: parse_or(
                    &lookup,
                    "RATE_LIMITER_MILLISECONDS",
                    DEFAULT_RATE_LIMIT_MS,
                )?,
                global_burst: parse_or(&lookup, "RATE_LIMITER_BURST", DEFAULT_RATE_LIMIT_BURST)?,
                tools_per_second: parse_or(
                    &lookup,
                    "RATE_LIMITER_TOOLS_SECONDS",
                    DEFAULT_TOOL_RATE_LIMIT_SECONDS,
                )?,
                tools_burst: parse_or(
                    &lookup,
                    "RATE_LIMITER_TOOLS_BURST",
                    DEFAULT_TOOL_RATE_LIMIT_BURST,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/rhythm90".to_string()),
            ("FRONTEND_ORIGIN", "https://app.rhythm90.test".to_string()),
            ("JWT_ISSUER", "rhythm90".to_string()),
            ("JWT_AUDIENCE", "rhythm90-app".to_string()),
            ("STRIPE_WEBHOOK_SECRET", "whsec_test".to_string()),
            ("AI_UPSTREAM_URL", "https://ai.internal.test/v1/tools".to_string()),
            ("AI_UPSTREAM_API_KEY", "key".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_values_are_absent() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.usage.lookup_timeout, Duration::from_millis(2000));
        assert_eq!(config.usage.ledger_backend, LedgerBackend::Postgres);
        assert!(config.usage.plan_limits_path.is_none());
        assert_eq!(config.settings_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.rate_limit.global_burst, 20);
    }

    #[test]
    fn optional_values_override_defaults() {
        let mut env = base_env();
        env.insert("USAGE_LOOKUP_TIMEOUT_MS", "500".into());
        env.insert("USAGE_LEDGER_BACKEND", "memory".into());
        env.insert("PLAN_LIMITS_PATH", "/etc/rhythm90/limits.json".into());
        let config = load(&env).unwrap();
        assert_eq!(config.usage.lookup_timeout, Duration::from_millis(500));
        assert_eq!(config.usage.ledger_backend, LedgerBackend::Memory);
        assert_eq!(
            config.usage.plan_limits_path,
            Some(PathBuf::from("/etc/rhythm90/limits.json"))
        );
    }

    #[test]
    fn missing_required_value_is_reported_by_name() {
        let mut env = base_env();
        env.remove("STRIPE_WEBHOOK_SECRET");
        assert_eq!(
            load(&env).unwrap_err(),
            ConfigError::Missing("STRIPE_WEBHOOK_SECRET")
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut env = base_env();
        env.insert("USAGE_LOOKUP_TIMEOUT_MS", "soon".into());
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                name: "USAGE_LOOKUP_TIMEOUT_MS",
                ..
            })
        ));

        let mut env = base_env();
        env.insert("USAGE_LEDGER_BACKEND", "redis".into());
        assert!(load(&env).is_err());
    }
}
