use crate::application::tooling::ToolInvokeError;
use crate::domain::types::ArgumentError;
use crate::infrastructure::model::ModelError;
use thiserror::Error;

/// Turn-fatal failures. The conversation is rolled back by the caller.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model kept requesting tools after {limit} rounds")]
    ToolLoopExceeded { limit: usize },
}

impl ResolveError {
    pub fn user_message(&self) -> String {
        match self {
            ResolveError::Model(err) => err.user_message(),
            ResolveError::ToolLoopExceeded { limit } => format!(
                "The model requested tools {limit} times in a row without answering. Try rephrasing the question."
            ),
        }
    }
}

/// Per-call failures. These never abort a turn; their text is handed back
/// to the model as the tool result.
#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("invalid arguments for tool '{tool}': {source}")]
    ArgumentParse {
        tool: String,
        #[source]
        source: ArgumentError,
    },
    #[error("invalid tool name '{tool}': expected '<server>_<tool>'")]
    InvalidToolName { tool: String },
    #[error("server not found: '{server}' (requested tool '{tool}')")]
    UnknownServer { server: String, tool: String },
    #[error("tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl ToolCallError {
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            ToolCallError::InvalidToolName { .. } | ToolCallError::UnknownServer { .. }
        )
    }
}
