use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::ToolInvokeError;

/// One entry of a server's `tools/list` answer, as reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerToolInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

impl ServerToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            input_schema: Some(input_schema),
        }
    }
}

/// A connected tool provider.
///
/// `list_tools` and `invoke` fail with [`ToolInvokeError::NotInitialized`]
/// until `initialize` has succeeded. Implementations serialize their own
/// requests; callers may invoke different handles concurrently.
#[async_trait]
pub trait ToolServerHandle: Send + Sync {
    fn alias(&self) -> &str;

    async fn initialize(&self) -> Result<(), ToolInvokeError>;

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError>;

    async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ToolInvokeError>;

    /// Close the channel and release the provider. Safe to call twice.
    async fn shutdown(&self) -> Result<(), ToolInvokeError>;
}
