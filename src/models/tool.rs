use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PLAY_BUILDER: &str = "play_builder";
pub const SIGNAL_LAB: &str = "signal_lab";
pub const RITUAL_GUIDE: &str = "ritual_guide";
pub const QUARTERLY_PLANNER: &str = "quarterly_planner";

pub const CORE_TOOLS: [&str; 4] = [PLAY_BUILDER, SIGNAL_LAB, RITUAL_GUIDE, QUARTERLY_PLANNER];

pub const MINI_TOOLS: [&str; 9] = [
    "okr_drafter",
    "persona_builder",
    "campaign_namer",
    "channel_mixer",
    "budget_splitter",
    "retro_facilitator",
    "hypothesis_checker",
    "metric_picker",
    "brief_polisher",
];

const MAX_TOOL_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidToolName {
    #[error("tool name must not be empty")]
    Empty,
    #[error("tool name exceeds {MAX_TOOL_NAME_LEN} characters")]
    TooLong,
    #[error("tool name must be a lowercase snake_case slug: {0}")]
    Malformed(String),
}

/// Lowercase snake_case slug naming an AI tool. Whether the catalog knows the
/// tool is a separate question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

impl ToolName {
    pub fn parse(raw: &str) -> Result<Self, InvalidToolName> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InvalidToolName::Empty);
        }
        if raw.len() > MAX_TOOL_NAME_LEN {
            return Err(InvalidToolName::TooLong);
        }

        let mut chars = raw.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !starts_with_letter || !rest_ok {
            return Err(InvalidToolName::Malformed(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ToolName {
    type Error = InvalidToolName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ToolName::parse(&value)
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        value.0
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn all_tools() -> impl Iterator<Item = &'static str> {
    CORE_TOOLS.into_iter().chain(MINI_TOOLS)
}
