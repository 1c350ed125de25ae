use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::plan::PlanId;
use crate::models::tool::{all_tools, CORE_TOOLS, MINI_TOOLS, QUARTERLY_PLANNER};

use super::UsageError;

pub const UNLIMITED: i64 = -1;

/// Plan → tool → monthly call limit, where `UNLIMITED` (-1) means no cap.
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    async fn limit_for(&self, plan: &str, tool: &str) -> Result<i64, UsageError>;

    async fn tools(&self) -> Result<Vec<String>, UsageError>;
}

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read plan limits file: {0}")]
    Io(#[from] std::io::Error),
    #[error("plan limits file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown plan in plan limits: {0}")]
    UnknownPlan(String),
    #[error("invalid limit {limit} for {plan}/{tool}; expected -1 or a non-negative integer")]
    InvalidLimit {
        plan: String,
        tool: String,
        limit: i64,
    },
    #[error("plan limits do not define the {0} plan")]
    MissingPlan(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPlanCatalog {
    limits: HashMap<PlanId, BTreeMap<String, i64>>,
}

impl StaticPlanCatalog {
    pub fn builtin() -> Self {
        let mut limits = HashMap::new();

        let mut free = BTreeMap::new();
        let mut pro_limited = BTreeMap::new();
        let mut pro_unlimited = BTreeMap::new();

        for tool in CORE_TOOLS {
            let (free_limit, pro_limit) = if tool == QUARTERLY_PLANNER {
                (1, 10)
            } else {
                (3, 50)
            };
            free.insert(tool.to_string(), free_limit);
            pro_limited.insert(tool.to_string(), pro_limit);
        }
        for tool in MINI_TOOLS {
            free.insert(tool.to_string(), 5);
            pro_limited.insert(tool.to_string(), 100);
        }
        for tool in all_tools() {
            pro_unlimited.insert(tool.to_string(), UNLIMITED);
        }

        limits.insert(PlanId::Free, free);
        limits.insert(PlanId::ProLimited, pro_limited);
        limits.insert(PlanId::ProUnlimited, pro_unlimited);

        Self { limits }
    }

    /// Parses `{"free": {"play_builder": 3, ...}, "pro_limited": {...}, ...}`.
    /// The free plan is mandatory since it is the fallback for lapsed plans.
    pub fn from_json(raw: &str) -> Result<Self, CatalogLoadError> {
        let parsed: HashMap<String, BTreeMap<String, i64>> = serde_json::from_str(raw)?;

        let mut limits = HashMap::new();
        for (plan_raw, tools) in parsed {
            let plan = PlanId::from_raw(&plan_raw)
                .ok_or_else(|| CatalogLoadError::UnknownPlan(plan_raw.clone()))?;
            for (tool, limit) in &tools {
                if *limit < UNLIMITED {
                    return Err(CatalogLoadError::InvalidLimit {
                        plan: plan_raw.clone(),
                        tool: tool.clone(),
                        limit: *limit,
                    });
                }
            }
            limits.insert(plan, tools);
        }

        if !limits.contains_key(&PlanId::Free) {
            return Err(CatalogLoadError::MissingPlan(PlanId::Free.as_str()));
        }

        Ok(Self { limits })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn lookup(&self, plan: &str, tool: &str) -> Option<i64> {
        let plan = PlanId::from_raw(plan)?;
        self.limits.get(&plan)?.get(tool).copied()
    }

    /// Rows of `(plan, tool, limit)` ordered by plan then tool.
    pub fn rows(&self) -> Vec<(PlanId, String, i64)> {
        let mut plans: Vec<_> = self.limits.keys().copied().collect();
        plans.sort();
        plans
            .into_iter()
            .flat_map(|plan| {
                self.limits[&plan]
                    .iter()
                    .map(move |(tool, limit)| (plan, tool.clone(), *limit))
            })
            .collect()
    }
}

#[async_trait]
impl PlanCatalog for StaticPlanCatalog {
    async fn limit_for(&self, plan: &str, tool: &str) -> Result<i64, UsageError> {
        self.lookup(plan, tool)
            .ok_or_else(|| UsageError::UnknownPlanOrTool {
                plan: plan.to_string(),
                tool: tool.to_string(),
            })
    }

    async fn tools(&self) -> Result<Vec<String>, UsageError> {
        let mut tools: Vec<String> = self
            .limits
            .values()
            .flat_map(|tools| tools.keys().cloned())
            .collect();
        tools.sort();
        tools.dedup();
        Ok(tools)
    }
}
