//! The external tutoring oracle: request shape, the trait the session talks
//! to, and the LLM-backed implementation.

pub mod contract;
pub mod prompt;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::knowledge::KnowledgeGraph;
use crate::services::llm_provider::{ChatMessage, LLMError, LLMProvider};

pub use contract::{validate_record, TutoringRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Everything the oracle sees for one turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub message: String,
    pub knowledge_graph: KnowledgeGraph,
    /// Most recent last, already cut to the history window; ends with `message`
    pub conversation_history: Vec<ChatTurn>,
    #[serde(skip)]
    pub instructions: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Transport(String),
    #[error("oracle contract violation: {0}")]
    Contract(String),
}

impl From<LLMError> for OracleError {
    fn from(err: LLMError) -> Self {
        if err.is_contract() {
            OracleError::Contract(err.to_string())
        } else {
            OracleError::Transport(err.to_string())
        }
    }
}

/// Produces the raw structured record for a request. Validation happens in
/// the session, so implementations return the record untouched.
pub trait Oracle: Send + Sync {
    fn consult(
        &self,
        request: &OracleRequest,
    ) -> impl Future<Output = Result<Value, OracleError>> + Send;
}

/// Oracle backed by an OpenAI-compatible chat endpoint with a forced tool call
#[derive(Clone)]
pub struct LLMOracle {
    provider: LLMProvider,
}

impl LLMOracle {
    pub fn new(provider: LLMProvider) -> Self {
        Self { provider }
    }

    pub fn from_env() -> Self {
        Self::new(LLMProvider::from_env())
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    fn messages(request: &OracleRequest) -> Result<Vec<ChatMessage>, OracleError> {
        let graph = serde_json::to_string(&request.knowledge_graph)
            .map_err(|e| OracleError::Transport(format!("failed to encode knowledge graph: {e}")))?;

        let mut messages = Vec::with_capacity(request.conversation_history.len() + 2);
        messages.push(ChatMessage::new("system", request.instructions.as_str()));
        messages.push(ChatMessage::new("system", format!("Knowledge graph JSON: {graph}")));
        messages.extend(
            request
                .conversation_history
                .iter()
                .map(|turn| ChatMessage::new(turn.role.as_str(), turn.content.as_str())),
        );
        Ok(messages)
    }
}

impl Oracle for LLMOracle {
    async fn consult(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        let messages = Self::messages(request)?;
        let tool = prompt::tool_definition();
        let value = self.provider.call_tool(&messages, &tool).await?;
        tracing::debug!(model = %self.provider.config().model, "oracle replied");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = OracleRequest {
            message: "is it 4?".into(),
            knowledge_graph: KnowledgeGraph::default(),
            conversation_history: vec![ChatTurn::user("is it 4?")],
            instructions: "secret".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"], "is it 4?");
        assert_eq!(value["conversationHistory"][0]["role"], "user");
        assert!(value["knowledgeGraph"].is_object());
        assert!(value.get("instructions").is_none());
    }

    #[test]
    fn test_llm_messages_order() {
        let request = OracleRequest {
            message: "next".into(),
            knowledge_graph: KnowledgeGraph::default(),
            conversation_history: vec![
                ChatTurn::user("first"),
                ChatTurn::assistant("hint"),
                ChatTurn::user("next"),
            ],
            instructions: "be kind".into(),
        };
        let messages = LLMOracle::messages(&request).unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].content.as_deref(), Some("be kind"));
        assert_eq!(messages[3].role, "assistant");
        assert_eq!(messages[4].content.as_deref(), Some("next"));
    }

    #[test]
    fn test_llm_error_mapping() {
        let contract: OracleError = LLMError::MissingToolCall(prompt::TOOL_NAME.into()).into();
        assert!(matches!(contract, OracleError::Contract(_)));
        let transport: OracleError = LLMError::NotConfigured("LLM_API_KEY").into();
        assert!(matches!(transport, OracleError::Transport(_)));
    }
}
