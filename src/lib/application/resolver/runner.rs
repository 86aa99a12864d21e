use super::dispatch::dispatch_batch;
use super::errors::ResolveError;
use super::models::{ResolvedTurn, ResolverOptions, ToolStep};
use crate::application::catalog::ToolCatalog;
use crate::application::conversation::ConversationState;
use crate::application::tooling::ServerRegistry;
use crate::domain::types::ChatMessage;
use crate::infrastructure::model::{ModelProvider, ModelRequest, ModelResponse};
use tracing::{debug, info, warn};

enum ResolverState {
    AwaitingModel,
    ModelResponded(ModelResponse),
    Dispatching(ChatMessage),
    Done(ChatMessage),
}

impl ResolverState {
    fn name(&self) -> &'static str {
        match self {
            ResolverState::AwaitingModel => "awaiting_model",
            ResolverState::ModelResponded(_) => "model_responded",
            ResolverState::Dispatching(_) => "dispatching",
            ResolverState::Done(_) => "done",
        }
    }
}

/// Borrows the session's collaborators for the duration of one turn.
pub struct ToolCallResolver<'a, P: ModelProvider + ?Sized> {
    provider: &'a P,
    catalog: &'a ToolCatalog,
    registry: &'a ServerRegistry,
    options: &'a ResolverOptions,
}

impl<'a, P: ModelProvider + ?Sized> ToolCallResolver<'a, P> {
    pub fn new(
        provider: &'a P,
        catalog: &'a ToolCatalog,
        registry: &'a ServerRegistry,
        options: &'a ResolverOptions,
    ) -> Self {
        Self {
            provider,
            catalog,
            registry,
            options,
        }
    }

    /// Resolve the turn whose user message is already in `conversation`.
    ///
    /// Tool exchanges are appended to `conversation` as they complete; the
    /// final assistant message is returned, not appended.
    pub async fn resolve(
        &self,
        conversation: &mut ConversationState,
    ) -> Result<ResolvedTurn, ResolveError> {
        let tools = self.catalog.function_definitions();
        let mut steps: Vec<ToolStep> = Vec::new();
        let mut model_calls = 0usize;
        let mut tool_invocations = 0usize;
        let mut rounds = 0usize;
        let mut state = ResolverState::AwaitingModel;

        loop {
            debug!(state = state.name(), round = rounds, "Resolver state");
            state = match state {
                ResolverState::AwaitingModel => {
                    let request = ModelRequest {
                        model: self.options.model.clone(),
                        messages: conversation
                            .request_messages(self.options.system_prompt.as_deref()),
                        tools: tools.clone(),
                    };
                    model_calls += 1;
                    ResolverState::ModelResponded(self.provider.chat(request).await?)
                }
                ResolverState::ModelResponded(response) => {
                    if response.requested_calls().is_empty() {
                        let answer = response.message.text().unwrap_or_default().to_string();
                        ResolverState::Done(ChatMessage::assistant(answer))
                    } else if rounds >= self.options.max_tool_rounds {
                        warn!(
                            limit = self.options.max_tool_rounds,
                            "Model exceeded tool round limit"
                        );
                        return Err(ResolveError::ToolLoopExceeded {
                            limit: self.options.max_tool_rounds,
                        });
                    } else {
                        ResolverState::Dispatching(response.message)
                    }
                }
                ResolverState::Dispatching(assistant) => {
                    rounds += 1;
                    info!(
                        round = rounds,
                        calls = assistant.tool_calls().len(),
                        "Model requested tool calls"
                    );
                    let outcomes = dispatch_batch(self.registry, assistant.tool_calls()).await;
                    let mut results = Vec::with_capacity(outcomes.len());
                    for outcome in outcomes {
                        if outcome.reached_server {
                            tool_invocations += 1;
                        }
                        steps.push(outcome.step);
                        results.push(outcome.result);
                    }
                    conversation.append_tool_exchange(assistant, results);
                    ResolverState::AwaitingModel
                }
                ResolverState::Done(final_message) => {
                    info!(model_calls, tool_invocations, "Turn resolved");
                    let answer = final_message.text().unwrap_or_default().to_string();
                    return Ok(ResolvedTurn {
                        answer,
                        final_message,
                        steps,
                        model_calls,
                        tool_invocations,
                    });
                }
            };
        }
    }
}
