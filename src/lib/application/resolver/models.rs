use crate::constants::DEFAULT_MAX_TOOL_ROUNDS;
use crate::domain::types::ChatMessage;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_tool_rounds: usize,
}

impl ResolverOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }
}

/// One executed (or rejected) tool call.
#[derive(Debug, Clone)]
pub struct ToolStep {
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    pub success: bool,
    pub output: String,
}

impl ToolStep {
    /// Compact JSON for the console; unparsed argument strings are shown raw.
    pub fn arguments_text(&self) -> String {
        match &self.arguments {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Result of driving one user turn to `Done`.
#[derive(Debug, Clone)]
pub struct ResolvedTurn {
    pub answer: String,
    /// Assistant message to persist; never carries tool calls.
    pub final_message: ChatMessage,
    pub steps: Vec<ToolStep>,
    pub model_calls: usize,
    /// Calls that reached a server handle.
    pub tool_invocations: usize,
}
