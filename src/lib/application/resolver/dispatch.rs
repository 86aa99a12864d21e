use super::errors::ToolCallError;
use super::models::ToolStep;
use crate::application::catalog::split_qualified_name;
use crate::application::tooling::ServerRegistry;
use crate::domain::types::{ChatMessage, ToolCall, ToolInvocationRequest};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of one call in a batch.
pub(super) struct Dispatched {
    pub result: ChatMessage,
    pub step: ToolStep,
    pub reached_server: bool,
}

/// Run every call of a batch concurrently. Results come back in the order the
/// calls were issued, whatever order they complete in.
pub(super) async fn dispatch_batch(registry: &ServerRegistry, calls: &[ToolCall]) -> Vec<Dispatched> {
    join_all(calls.iter().map(|call| dispatch_one(registry, call))).await
}

async fn dispatch_one(registry: &ServerRegistry, call: &ToolCall) -> Dispatched {
    let raw_arguments = Value::String(call.arguments.clone());
    let request = match ToolInvocationRequest::from_call(call) {
        Ok(request) => request,
        Err(source) => {
            let error = ToolCallError::ArgumentParse {
                tool: call.name.clone(),
                source,
            };
            return rejected(call, raw_arguments, error, false);
        }
    };
    let arguments = Value::Object(request.arguments.clone());

    let Some((alias, local)) = split_qualified_name(&request.qualified_name) else {
        let error = ToolCallError::InvalidToolName {
            tool: request.qualified_name.clone(),
        };
        return rejected(call, arguments, error, false);
    };
    let Some(handle) = registry.get(alias) else {
        let error = ToolCallError::UnknownServer {
            server: alias.to_string(),
            tool: request.qualified_name.clone(),
        };
        return rejected(call, arguments, error, false);
    };

    debug!(
        server = %alias,
        tool = %local,
        call_id = %request.call_id,
        "Invoking tool"
    );
    match handle.invoke(local, request.arguments).await {
        Ok(output) => Dispatched {
            result: ChatMessage::tool_result(&request.call_id, output.clone()),
            step: ToolStep {
                call_id: request.call_id,
                tool: request.qualified_name,
                arguments,
                success: true,
                output,
            },
            reached_server: true,
        },
        Err(source) => {
            if source.is_fatal_to_handle() {
                warn!(server = %alias, %source, "Tool server is no longer usable");
            }
            let error = ToolCallError::Execution {
                tool: request.qualified_name.clone(),
                source,
            };
            rejected(call, arguments, error, true)
        }
    }
}

fn rejected(call: &ToolCall, arguments: Value, error: ToolCallError, reached_server: bool) -> Dispatched {
    if error.is_routing_error() {
        warn!(tool = %call.name, call_id = %call.id, %error, "Model requested an unroutable tool");
    } else {
        warn!(tool = %call.name, call_id = %call.id, %error, "Tool call failed");
    }
    let output = error.to_string();
    Dispatched {
        result: ChatMessage::tool_result(&call.id, output.clone()),
        step: ToolStep {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            arguments,
            success: false,
            output,
        },
        reached_server,
    }
}
