//! OpenAI-compatible client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::base::HttpClientBase;
use crate::config::ModelConfig;
use crate::domain::types::{ChatMessage, ToolCall};
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::ModelProvider;
use crate::infrastructure::model::types::{FinishReason, ModelError, ModelRequest, ModelResponse};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// OpenAI-compatible client (works with OpenAI, DeepSeek, Groq, vLLM, etc.)
#[derive(Clone)]
pub struct OpenAIClient {
    base: HttpClientBase,
}

impl OpenAIClient {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            base: HttpClientBase::new(config.base_url.clone(), Some(config.api_key.clone())),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAIClient {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.base.build_url(CHAT_COMPLETIONS_PATH);

        let payload = OpenAIRequest {
            model: request.model.clone(),
            messages: MessageAdapter::to_openai_format(&request.messages),
            tools: request.tools,
            stream: false,
        };

        info!(
            endpoint = self.base.endpoint.as_str(),
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = payload.tools.len(),
            "Sending request to OpenAI-compatible endpoint"
        );

        let response: OpenAIResponse = self.base.post_with_bearer(&url, &payload).await?;
        debug!("Received response from OpenAI-compatible endpoint");

        parse_response(&self.base.endpoint, response)
    }
}

fn parse_response(endpoint: &str, response: OpenAIResponse) -> Result<ModelResponse, ModelError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::invalid_response(endpoint, "missing choices"))?;
    let message = choice
        .message
        .ok_or_else(|| ModelError::invalid_response(endpoint, "missing message"))?;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
            let arguments = match call.function.arguments {
                Value::String(raw) => raw,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            ToolCall::new(id, call.function.name, arguments)
        })
        .collect::<Vec<_>>();

    let finish_reason = FinishReason::parse(choice.finish_reason.as_deref());
    if tool_calls.is_empty() && message.content.is_none() {
        return Err(ModelError::invalid_response(endpoint, "missing content"));
    }

    Ok(ModelResponse {
        message: ChatMessage::assistant_tool_calls(message.content, tool_calls),
        finish_reason,
    })
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    id: Option<String>,
    function: OpenAIFunction,
}

#[derive(Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}
