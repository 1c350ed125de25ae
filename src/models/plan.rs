use serde::{Deserialize, Serialize};

pub const PLAN_FREE: &str = "free";
pub const PLAN_PRO_LIMITED: &str = "pro_limited";
pub const PLAN_PRO_UNLIMITED: &str = "pro_unlimited";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanId {
    Free,
    ProLimited,
    ProUnlimited,
}

impl PlanId {
    pub const ALL: [PlanId; 3] = [PlanId::Free, PlanId::ProLimited, PlanId::ProUnlimited];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => PLAN_FREE,
            PlanId::ProLimited => PLAN_PRO_LIMITED,
            PlanId::ProUnlimited => PLAN_PRO_UNLIMITED,
        }
    }

    /// Accepts the stored identifier plus the spellings billing metadata tends to
    /// carry (`Pro-Limited`, `pro unlimited`). Anything else is unknown; callers
    /// must not fall back to a paid plan.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' || c == '.' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            PLAN_FREE => Some(PlanId::Free),
            PLAN_PRO_LIMITED => Some(PlanId::ProLimited),
            PLAN_PRO_UNLIMITED => Some(PlanId::ProUnlimited),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
