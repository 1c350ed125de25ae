use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::usage::{UsagePeriod, UsageRecord};

use super::usage_repository::UsageLedger;

type LedgerKey = (Uuid, String, UsagePeriod);

/// Process-local ledger for development and tests. Counts do not survive a
/// restart.
#[derive(Default)]
pub struct InMemoryUsageLedger {
    counts: DashMap<LedgerKey, i64>,
}

impl InMemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn count_for(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        let key = (team_id, tool_name.to_string(), *period);
        Ok(self.counts.get(&key).map(|count| *count).unwrap_or(0))
    }

    async fn increment(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut entry = self
            .counts
            .entry((team_id, tool_name.to_string(), *period))
            .or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn usage_for_period(
        &self,
        team_id: Uuid,
        period: &UsagePeriod,
    ) -> Result<Vec<UsageRecord>, sqlx::Error> {
        let mut records: Vec<UsageRecord> = self
            .counts
            .iter()
            .filter(|entry| entry.key().0 == team_id && entry.key().2 == *period)
            .map(|entry| UsageRecord {
                team_id,
                tool_name: entry.key().1.clone(),
                period_start: period.start,
                period_end: period.end,
                count: *entry.value(),
            })
            .collect();
        records.sort_by(|a, b| a.tool_name.cmp(&b.tool_name));
        Ok(records)
    }
}
