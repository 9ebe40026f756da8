//! The model-service seam.
//!
//! The turn loop only ever sees the [`ModelClient`] trait: one blocking call
//! taking the full wire-format message sequence plus the fixed tool schema,
//! returning optional final text and zero or more tool-call requests.
//! Transport and auth live behind the trait (see [`openai::OpenAiClient`]).

pub mod openai;

use serde_json::Value;
use thiserror::Error;

use crate::agent::AgentConfig;
use crate::session::{Message, ToolCall};

/// One model response: final text, tool-call requests, or both.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub content: Option<String>,
    /// Requests in the order the model produced them. Never reordered.
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    /// Whether this response asks for tool execution rather than ending the
    /// turn.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Error type for model-service calls. These are the only failures the turn
/// loop does not convert into conversation content.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("model request failed: {0}")]
    Transport(String),

    #[error("failed to decode model response: {0}")]
    Decode(String),

    #[error("model returned no choices")]
    EmptyResponse,
}

/// Blocking model-service capability.
pub trait ModelClient {
    fn complete(
        &self,
        messages: &[Message],
        tools: &[Value],
        config: &AgentConfig,
    ) -> Result<ModelResponse, ModelError>;
}
