//! Usage metering and plan gating.
//!
//! A tool call is guarded by [`gate::UsageGate`]: `check_limit` before the AI
//! provider is called, `record_usage` after it succeeded. The gate combines the
//! team's subscription, the [`billing_period`] resolver, a
//! [`plan_catalog::PlanCatalog`] and a [`crate::db::usage_repository::UsageLedger`]
//! and fails closed whenever one of them cannot answer.

use thiserror::Error;

pub mod billing_period;
pub mod gate;
pub mod plan_catalog;

pub use gate::{LimitCheck, LimitReason, LimitStatus, UsageGate, UsageRecorded, UsageSummary};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("usage backend unavailable: {0}")]
    Unavailable(String),
    #[error("concurrent usage update conflict")]
    ConcurrencyConflict,
    #[error("unknown plan or tool: {plan}/{tool}")]
    UnknownPlanOrTool { plan: String, tool: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<sqlx::Error> for UsageError {
    fn from(err: sqlx::Error) -> Self {
        let conflict = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED);
        if conflict {
            UsageError::ConcurrencyConflict
        } else {
            UsageError::Unavailable(err.to_string())
        }
    }
}
