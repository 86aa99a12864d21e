use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("MCP server '{server}' has not completed the initialize handshake")]
    NotInitialized { server: String },
    #[error("MCP server '{server}' is unavailable: {reason}")]
    ServerUnavailable { server: String, reason: String },
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("tool '{tool}' on MCP server '{server}' failed: {message}")]
    Execution {
        server: String,
        tool: String,
        message: String,
    },
}

impl ToolInvokeError {
    /// Whether the handle can no longer serve any request.
    pub fn is_fatal_to_handle(&self) -> bool {
        matches!(
            self,
            ToolInvokeError::NotInitialized { .. }
                | ToolInvokeError::ServerUnavailable { .. }
                | ToolInvokeError::Spawn { .. }
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("server alias must not be empty")]
    EmptyAlias,
    #[error("server alias '{alias}' must not contain '{separator}'")]
    InvalidAlias { alias: String, separator: char },
    #[error("server alias '{alias}' is already registered")]
    DuplicateAlias { alias: String },
}
