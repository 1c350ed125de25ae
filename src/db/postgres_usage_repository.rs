use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::usage::{UsagePeriod, UsageRecord};

use super::usage_repository::UsageLedger;

pub struct PostgresUsageLedger {
    pub pool: PgPool,
}

#[async_trait]
impl UsageLedger for PostgresUsageLedger {
    async fn count_for(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT count
            FROM usage_records
            WHERE team_id = $1
              AND tool_name = $2
              AND period_start = $3
              AND period_end = $4
            "#,
        )
        .bind(team_id)
        .bind(tool_name)
        .bind(period.start)
        .bind(period.end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.unwrap_or(0))
    }

    async fn increment(
        &self,
        team_id: Uuid,
        tool_name: &str,
        period: &UsagePeriod,
    ) -> Result<i64, sqlx::Error> {
        // Single statement upsert: concurrent callers serialize on the row lock.
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO usage_records (team_id, tool_name, period_start, period_end, count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 1, now(), now())
            ON CONFLICT (team_id, tool_name, period_start, period_end)
            DO UPDATE SET count = usage_records.count + 1, updated_at = now()
            RETURNING count
            "#,
        )
        .bind(team_id)
        .bind(tool_name)
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await
    }

    async fn usage_for_period(
        &self,
        team_id: Uuid,
        period: &UsagePeriod,
    ) -> Result<Vec<UsageRecord>, sqlx::Error> {
        sqlx::query_as::<_, UsageRecord>(
            r#"
            SELECT team_id, tool_name, period_start, period_end, count
            FROM usage_records
            WHERE team_id = $1
              AND period_start = $2
              AND period_end = $3
            ORDER BY tool_name ASC
            "#,
        )
        .bind(team_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await
    }
}
