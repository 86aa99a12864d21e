//! Model traits

use super::types::{ModelError, ModelRequest, ModelResponse};
use async_trait::async_trait;

/// "Complete chat" against a language model endpoint.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send the conversation and tool catalog, get one assistant message back
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}
