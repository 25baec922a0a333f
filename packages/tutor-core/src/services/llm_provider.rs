use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as sent by the provider
    pub arguments: String,
}

/// A function the model is forced to call
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn tool_call(&self, name: &str) -> Option<&ToolCall> {
        self.choices
            .iter()
            .flat_map(|c| c.message.tool_calls.iter().flatten())
            .find(|call| call.function.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
    #[error("reply did not call {0}")]
    MissingToolCall(String),
    #[error("tool arguments are not valid JSON: {0}")]
    ToolArguments(serde_json::Error),
}

impl LLMError {
    /// Whether the failure lies in the reply's content rather than in getting it
    pub fn is_contract(&self) -> bool {
        matches!(
            self,
            LLMError::EmptyChoices | LLMError::MissingToolCall(_) | LLMError::ToolArguments(_)
        )
    }
}

#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY");
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = normalize_endpoint(
            env_string("LLM_API_ENDPOINT")
                .or_else(|| env_string("LLM_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        );
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));
        Self::new(LLMConfig { api_key, model, api_endpoint, timeout })
    }

    pub fn new(config: LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    /// Sends `messages` with `tool` as the only tool and forces the model to
    /// call it. Returns the parsed argument object.
    pub async fn call_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolDefinition,
    ) -> Result<serde_json::Value, LLMError> {
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
            "tools": [{
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            }],
            "tool_choice": {
                "type": "function",
                "function": { "name": tool.name }
            }
        });

        let response = self.send(&payload).await?;
        if response.choices.is_empty() {
            return Err(LLMError::EmptyChoices);
        }
        let call = response
            .tool_call(&tool.name)
            .ok_or_else(|| LLMError::MissingToolCall(tool.name.clone()))?;
        serde_json::from_str(&call.function.arguments).map_err(LLMError::ToolArguments)
    }

    async fn send(&self, payload: &serde_json::Value) -> Result<ChatResponse, LLMError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(LLMError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint.trim_end_matches('/'));
        self.post_with_retry(&url, api_key, payload).await
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, LLMError> {
        let mut last_error: Option<LLMError> = None;

        for retry in 0..=MAX_RETRIES {
            match self.client.post(url).bearer_auth(api_key).json(payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        match serde_json::from_slice(&bytes) {
                            Ok(v) => return Ok(v),
                            Err(e) => {
                                let body_str = String::from_utf8_lossy(&bytes);
                                tracing::error!(error = %e, body = %body_str, "failed to parse LLM response JSON");
                                return Err(LLMError::Json(e));
                            }
                        }
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LLMError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        warn!(retry, ?status, "LLM request failed, retrying");
                        sleep(backoff(retry)).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = LLMError::Request(e);
                    if retry < MAX_RETRIES {
                        warn!(retry, "LLM request error, retrying");
                        sleep(backoff(retry)).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(LLMError::NotConfigured("unknown")))
    }
}

fn backoff(retry: usize) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * (1 << retry))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
