use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::subscription_repository::SubscriptionRepository;
use crate::db::usage_repository::UsageLedger;
use crate::models::tool::{all_tools, ToolName};
use crate::models::usage::UsagePeriod;

use super::billing_period;
use super::plan_catalog::{PlanCatalog, UNLIMITED};
use super::UsageError;

const MAX_INCREMENT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitStatus {
    Ok,
    NearLimit,
    OverLimit,
}

impl LimitStatus {
    /// Unlimited is always OK; otherwise over at `used >= limit` and near at
    /// 80% of the limit.
    pub fn evaluate(used: i64, limit: i64) -> Self {
        if limit == UNLIMITED {
            LimitStatus::Ok
        } else if used >= limit {
            LimitStatus::OverLimit
        } else if used.saturating_mul(5) >= limit.saturating_mul(4) {
            LimitStatus::NearLimit
        } else {
            LimitStatus::Ok
        }
    }

    pub fn allows_call(self) -> bool {
        !matches!(self, LimitStatus::OverLimit)
    }
}

/// Why a check failed closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitReason {
    Unavailable,
    Configuration,
    UnknownPlanOrTool,
}

impl LimitReason {
    fn from_error(err: &UsageError) -> Self {
        match err {
            UsageError::Configuration(_) => LimitReason::Configuration,
            UsageError::UnknownPlanOrTool { .. } => LimitReason::UnknownPlanOrTool,
            _ => LimitReason::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub status: LimitStatus,
    pub used: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<LimitReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<UsagePeriod>,
}

impl LimitCheck {
    fn closed(reason: LimitReason, period: Option<UsagePeriod>) -> Self {
        Self {
            status: LimitStatus::OverLimit,
            used: 0,
            limit: 0,
            reason: Some(reason),
            period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecorded {
    pub used: i64,
    pub period: UsagePeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub tool: String,
    #[serde(flatten)]
    pub check: LimitCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub plan: Option<String>,
    pub period: Option<UsagePeriod>,
    pub tools: Vec<ToolUsage>,
}

struct MeteringContext {
    plan: String,
    period: UsagePeriod,
}

/// Decides whether a team may call a tool and records calls that happened.
///
/// Checks never mutate the ledger and never fail open: any dependency that
/// cannot answer within `lookup_timeout` produces `OVER_LIMIT` with a reason.
pub struct UsageGate {
    ledger: Arc<dyn UsageLedger>,
    catalog: Arc<dyn PlanCatalog>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    lookup_timeout: Duration,
}

impl UsageGate {
    pub fn new(
        ledger: Arc<dyn UsageLedger>,
        catalog: Arc<dyn PlanCatalog>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            catalog,
            subscriptions,
            lookup_timeout,
        }
    }

    pub async fn check_limit(
        &self,
        team_id: &str,
        tool_name: &str,
    ) -> Result<LimitCheck, UsageError> {
        let team_id = parse_team_id(team_id)?;
        let tool = parse_tool(tool_name)?;
        Ok(self
            .check_limit_at(team_id, &tool, OffsetDateTime::now_utc())
            .await)
    }

    pub async fn check_limit_at(
        &self,
        team_id: Uuid,
        tool: &ToolName,
        now: OffsetDateTime,
    ) -> LimitCheck {
        match self.metering_context(team_id, now).await {
            Ok(ctx) => self.evaluate_tool(team_id, &ctx, tool.as_str()).await,
            Err(err) => fail_closed(team_id, tool.as_str(), None, &err),
        }
    }

    /// Adds one call to the current period. Only call this once the tool call
    /// itself has succeeded.
    pub async fn record_usage(
        &self,
        team_id: &str,
        tool_name: &str,
    ) -> Result<UsageRecorded, UsageError> {
        let team_id = parse_team_id(team_id)?;
        let tool = parse_tool(tool_name)?;
        self.record_usage_at(team_id, &tool, OffsetDateTime::now_utc())
            .await
    }

    pub async fn record_usage_at(
        &self,
        team_id: Uuid,
        tool: &ToolName,
        now: OffsetDateTime,
    ) -> Result<UsageRecorded, UsageError> {
        let ctx = self.metering_context(team_id, now).await?;
        // Only catalog tools get ledger rows.
        self.bounded(
            "plan catalog",
            self.catalog.limit_for(&ctx.plan, tool.as_str()),
        )
        .await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .bounded(
                    "usage ledger",
                    self.ledger.increment(team_id, tool.as_str(), &ctx.period),
                )
                .await;
            match result {
                Ok(used) => {
                    debug!(%team_id, tool = %tool, used, "recorded tool usage");
                    return Ok(UsageRecorded {
                        used,
                        period: ctx.period,
                    });
                }
                Err(UsageError::ConcurrencyConflict) if attempt < MAX_INCREMENT_ATTEMPTS => {
                    warn!(%team_id, tool = %tool, attempt, "usage increment conflicted; retrying");
                }
                Err(UsageError::ConcurrencyConflict) => {
                    warn!(%team_id, tool = %tool, attempt, "usage increment kept conflicting");
                    return Err(UsageError::Unavailable(format!(
                        "usage increment conflicted {attempt} times"
                    )));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Status of every catalog tool for the team's current period.
    pub async fn usage_summary(&self, team_id: &str) -> Result<UsageSummary, UsageError> {
        let team_id = parse_team_id(team_id)?;
        Ok(self
            .usage_summary_at(team_id, OffsetDateTime::now_utc())
            .await)
    }

    pub async fn usage_summary_at(&self, team_id: Uuid, now: OffsetDateTime) -> UsageSummary {
        let tools = match self.bounded("plan catalog", self.catalog.tools()).await {
            Ok(tools) => tools,
            Err(err) => {
                warn!(%team_id, error = %err, "plan catalog could not list tools");
                all_tools().map(str::to_string).collect()
            }
        };

        let ctx = match self.metering_context(team_id, now).await {
            Ok(ctx) => ctx,
            Err(err) => {
                let reason = LimitReason::from_error(&err);
                warn!(%team_id, ?reason, error = %err, "usage summary failed closed");
                return UsageSummary {
                    plan: None,
                    period: None,
                    tools: tools
                        .into_iter()
                        .map(|tool| ToolUsage {
                            tool,
                            check: LimitCheck::closed(reason, None),
                        })
                        .collect(),
                };
            }
        };

        let counts = self
            .bounded(
                "usage ledger",
                self.ledger.usage_for_period(team_id, &ctx.period),
            )
            .await
            .map(|records| {
                records
                    .into_iter()
                    .map(|record| (record.tool_name, record.count))
                    .collect::<HashMap<_, _>>()
            });
        if let Err(err) = &counts {
            warn!(%team_id, error = %err, "usage summary could not read the ledger");
        }

        let mut usage = Vec::with_capacity(tools.len());
        for tool in tools {
            let limit = match self
                .bounded("plan catalog", self.catalog.limit_for(&ctx.plan, &tool))
                .await
            {
                Ok(limit) => limit,
                Err(err) => {
                    let check = fail_closed(team_id, &tool, Some(ctx.period), &err);
                    usage.push(ToolUsage { tool, check });
                    continue;
                }
            };
            let check = match &counts {
                Ok(counts) => {
                    let used = counts.get(&tool).copied().unwrap_or(0);
                    LimitCheck {
                        status: LimitStatus::evaluate(used, limit),
                        used,
                        limit,
                        reason: None,
                        period: Some(ctx.period),
                    }
                }
                Err(err) => LimitCheck {
                    limit,
                    ..LimitCheck::closed(LimitReason::from_error(err), Some(ctx.period))
                },
            };
            usage.push(ToolUsage { tool, check });
        }

        UsageSummary {
            plan: Some(ctx.plan),
            period: Some(ctx.period),
            tools: usage,
        }
    }

    async fn evaluate_tool(&self, team_id: Uuid, ctx: &MeteringContext, tool: &str) -> LimitCheck {
        let limit = match self
            .bounded("plan catalog", self.catalog.limit_for(&ctx.plan, tool))
            .await
        {
            Ok(limit) => limit,
            Err(err) => return fail_closed(team_id, tool, Some(ctx.period), &err),
        };

        let used = match self
            .bounded(
                "usage ledger",
                self.ledger.count_for(team_id, tool, &ctx.period),
            )
            .await
        {
            Ok(used) => used,
            Err(err) => {
                let mut check = fail_closed(team_id, tool, Some(ctx.period), &err);
                check.limit = limit;
                return check;
            }
        };

        LimitCheck {
            status: LimitStatus::evaluate(used, limit),
            used,
            limit,
            reason: None,
            period: Some(ctx.period),
        }
    }

    async fn metering_context(
        &self,
        team_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<MeteringContext, UsageError> {
        let subscription = self
            .bounded(
                "subscription store",
                self.subscriptions.find_for_team(team_id),
            )
            .await?
            .ok_or_else(|| {
                UsageError::Configuration(format!("team {team_id} has no subscription"))
            })?;

        let period = billing_period::current_window(subscription.renewal_anchor, now)?;

        Ok(MeteringContext {
            plan: subscription.effective_plan(now).to_string(),
            period,
        })
    }

    async fn bounded<T, E, F>(&self, source: &'static str, fut: F) -> Result<T, UsageError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<UsageError>,
    {
        match tokio::time::timeout(self.lookup_timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(UsageError::Unavailable(format!(
                "{source} did not answer within {}ms",
                self.lookup_timeout.as_millis()
            ))),
        }
    }
}

fn fail_closed(
    team_id: Uuid,
    tool: &str,
    period: Option<UsagePeriod>,
    err: &UsageError,
) -> LimitCheck {
    let reason = LimitReason::from_error(err);
    warn!(%team_id, tool, ?reason, error = %err, "usage check failed closed");
    LimitCheck::closed(reason, period)
}

fn parse_team_id(raw: &str) -> Result<Uuid, UsageError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| UsageError::InvalidRequest(format!("malformed team id: {raw}")))
}

fn parse_tool(raw: &str) -> Result<ToolName, UsageError> {
    ToolName::parse(raw).map_err(|err| UsageError::InvalidRequest(err.to_string()))
}
