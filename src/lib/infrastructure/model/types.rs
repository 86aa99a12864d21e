//! Model types - Request, Response, and Error types

use crate::domain::types::{ChatMessage, ToolCall};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Model request for one chat completion
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Function definitions offered to the model
    pub tools: Vec<Value>,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("stop") => FinishReason::Stop,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

/// Model response: one assistant message plus its finish indicator
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: ChatMessage::assistant(content),
            finish_reason: FinishReason::Stop,
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            message: ChatMessage::assistant_tool_calls(None, calls),
            finish_reason: FinishReason::ToolCalls,
        }
    }

    /// Tool calls the model asked for, if the finish indicator says so.
    pub fn requested_calls(&self) -> &[ToolCall] {
        if self.finish_reason == FinishReason::ToolCalls {
            self.message.tool_calls()
        } else {
            &[]
        }
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model endpoint '{endpoint}' requires an API key")]
    MissingApiKey { endpoint: String },
    #[error("network error calling model endpoint '{endpoint}': {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("model endpoint '{endpoint}' returned invalid response: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl ModelError {
    pub fn missing_api_key(endpoint: impl Into<String>) -> Self {
        Self::MissingApiKey {
            endpoint: endpoint.into(),
        }
    }

    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn invalid_response(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Short message suitable for the console
    pub fn user_message(&self) -> String {
        match self {
            ModelError::MissingApiKey { endpoint } => {
                format!("The model endpoint '{endpoint}' needs an API key.")
            }
            ModelError::Network { endpoint, source } => {
                if source.is_connect() {
                    format!("Could not connect to the model endpoint '{endpoint}'.")
                } else if source.is_timeout() {
                    format!("The request to '{endpoint}' timed out.")
                } else if let Some(status) = source.status() {
                    match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            format!("The model endpoint '{endpoint}' rejected the API key.")
                        }
                        StatusCode::NOT_FOUND => format!("Endpoint '{endpoint}' was not found."),
                        StatusCode::TOO_MANY_REQUESTS => {
                            format!("The model endpoint '{endpoint}' is rate limiting requests.")
                        }
                        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                            format!("The model endpoint '{endpoint}' is temporarily unavailable.")
                        }
                        _ => format!("The request to '{endpoint}' failed: {}", status.as_u16()),
                    }
                } else {
                    format!("Network error talking to '{endpoint}'.")
                }
            }
            ModelError::InvalidResponse { endpoint, .. } => {
                format!("The response from '{endpoint}' could not be understood.")
            }
        }
    }
}
