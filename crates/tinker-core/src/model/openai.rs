//! Blocking OpenAI chat-completions client.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{ModelClient, ModelError, ModelResponse};
use crate::agent::AgentConfig;
use crate::session::{Message, ToolCall};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Talks to an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build a client from `OPENAI_API_KEY`, honoring an `OPENAI_BASE_URL`
    /// override for compatible endpoints.
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| ModelError::MissingApiKey)?;
        let mut client = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            client.base_url = base_url;
        }
        Ok(client)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl ModelClient for OpenAiClient {
    fn complete(
        &self,
        messages: &[Message],
        tools: &[Value],
        config: &AgentConfig,
    ) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = build_request(messages, tools, config);

        log::debug!("model call: {} messages to {}", messages.len(), config.model);

        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|err| match err {
                ureq::Error::Status(code, response) => {
                    let detail = response.into_string().unwrap_or_default();
                    ModelError::Transport(format!("status {code}: {detail}"))
                }
                other => ModelError::Transport(other.to_string()),
            })?;

        let completion: Value = response
            .into_json()
            .map_err(|err| ModelError::Decode(err.to_string()))?;

        parse_completion(completion)
    }
}

fn build_request(messages: &[Message], tools: &[Value], config: &AgentConfig) -> Value {
    json!({
        "model": config.model,
        "messages": messages,
        "tools": tools,
        "tool_choice": "auto",
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
    })
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

fn parse_completion(completion: Value) -> Result<ModelResponse, ModelError> {
    let completion: ChatCompletion =
        serde_json::from_value(completion).map_err(|err| ModelError::Decode(err.to_string()))?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or(ModelError::EmptyResponse)?;

    Ok(ModelResponse {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
    })
}
