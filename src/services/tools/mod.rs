//! Boundary to the AI provider that produces tool output.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::tool::ToolName;
use crate::models::tool_output::SUPPORTED_SCHEMA_VERSION;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("AI provider request failed: {0}")]
    Transport(String),
    #[error("AI provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("AI provider returned a non-JSON body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub tool: ToolName,
    pub prompt: String,
    pub model: String,
    pub team_id: Uuid,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Raw provider JSON; validated by the caller against the tool schema.
    async fn invoke(&self, invocation: ToolInvocation) -> Result<Value, ToolInvokeError>;
}

#[derive(Clone)]
pub struct HttpToolInvoker {
    endpoint: String,
    api_key: String,
    http: Client,
}

impl HttpToolInvoker {
    pub fn new(http: &Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            http: http.clone(),
        }
    }

    pub fn from_settings(http: &Client, settings: &crate::config::AiUpstreamSettings) -> Self {
        Self::new(http, settings.url.clone(), settings.api_key.clone())
    }
}

#[derive(Serialize)]
struct UpstreamRequest<'a> {
    tool: &'a str,
    prompt: &'a str,
    model: &'a str,
    schema_version: u32,
}

#[async_trait]
impl ToolInvoker for HttpToolInvoker {
    async fn invoke(&self, invocation: ToolInvocation) -> Result<Value, ToolInvokeError> {
        let payload = UpstreamRequest {
            tool: invocation.tool.as_str(),
            prompt: &invocation.prompt,
            model: &invocation.model,
            schema_version: SUPPORTED_SCHEMA_VERSION,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ToolInvokeError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolInvokeError::Upstream { status, body });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| ToolInvokeError::Decode(e.to_string()))
    }
}
