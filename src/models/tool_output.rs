use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::tool::ToolName;

pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayOutput {
    pub title: String,
    #[serde(default)]
    pub hypothesis: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    pub signal: String,
    pub interpretation: String,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RitualOutput {
    pub ritual: String,
    #[serde(default)]
    pub cadence: Option<String>,
    #[serde(default)]
    pub agenda: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerOutput {
    #[serde(default)]
    pub quarter: Option<String>,
    #[serde(default)]
    pub priorities: Vec<String>,
    #[serde(default)]
    pub plays: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniToolOutput {
    pub content: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Provider output, discriminated by the `tool` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolOutput {
    PlayBuilder(PlayOutput),
    SignalLab(SignalOutput),
    RitualGuide(RitualOutput),
    QuarterlyPlanner(PlannerOutput),
    OkrDrafter(MiniToolOutput),
    PersonaBuilder(MiniToolOutput),
    CampaignNamer(MiniToolOutput),
    ChannelMixer(MiniToolOutput),
    BudgetSplitter(MiniToolOutput),
    RetroFacilitator(MiniToolOutput),
    HypothesisChecker(MiniToolOutput),
    MetricPicker(MiniToolOutput),
    BriefPolisher(MiniToolOutput),
}

impl ToolOutput {
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolOutput::PlayBuilder(_) => "play_builder",
            ToolOutput::SignalLab(_) => "signal_lab",
            ToolOutput::RitualGuide(_) => "ritual_guide",
            ToolOutput::QuarterlyPlanner(_) => "quarterly_planner",
            ToolOutput::OkrDrafter(_) => "okr_drafter",
            ToolOutput::PersonaBuilder(_) => "persona_builder",
            ToolOutput::CampaignNamer(_) => "campaign_namer",
            ToolOutput::ChannelMixer(_) => "channel_mixer",
            ToolOutput::BudgetSplitter(_) => "budget_splitter",
            ToolOutput::RetroFacilitator(_) => "retro_facilitator",
            ToolOutput::HypothesisChecker(_) => "hypothesis_checker",
            ToolOutput::MetricPicker(_) => "metric_picker",
            ToolOutput::BriefPolisher(_) => "brief_polisher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub schema_version: u32,
    #[serde(flatten)]
    pub output: ToolOutput,
}

#[derive(Debug, Error)]
pub enum ToolResponseError {
    #[error("tool response does not match any known schema: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
    #[error("requested {requested} but provider answered as {returned}")]
    ToolMismatch { requested: String, returned: String },
}

/// Validates raw provider JSON against the schema of the tool that was asked for.
pub fn validate_tool_response(
    requested: &ToolName,
    raw: Value,
) -> Result<ToolResponse, ToolResponseError> {
    let response: ToolResponse = serde_json::from_value(raw)?;

    if response.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(ToolResponseError::UnsupportedVersion(
            response.schema_version,
        ));
    }

    let returned = response.output.tool_name();
    if returned != requested.as_str() {
        return Err(ToolResponseError::ToolMismatch {
            requested: requested.to_string(),
            returned: returned.to_string(),
        });
    }

    Ok(response)
}
