use async_trait::async_trait;
use uuid::Uuid;

use crate::models::usage::{UsagePeriod, UsageRecord};

/// Per-team, per-tool, per-period call counts. Counts are only ever
/// incremented, and a record belongs to exactly one period.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Zero when the key has no record yet.
    async fn count_for(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error>;

    /// Creates the record if absent and adds one as a single atomic step,
    /// returning the new count.
    async fn increment(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error>;

    async fn usage_for_period(
        &self,
        team_id: Uuid,
        period: &UsagePeriod,
    ) -> Result<Vec<UsageRecord>, sqlx::Error>;
}
