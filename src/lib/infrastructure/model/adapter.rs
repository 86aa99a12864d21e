//! Message adapters - convert between domain messages and API formats

use crate::domain::types::{ChatMessage, ToolCall};
use serde_json::{Map, Value, json};

/// Adapter for converting messages to the OpenAI chat format
pub struct MessageAdapter;

impl MessageAdapter {
    /// Convert messages to OpenAI-style format, including tool calls and
    /// tool results
    pub fn to_openai_format(messages: &[ChatMessage]) -> Vec<Value> {
        messages.iter().map(Self::message_to_openai).collect()
    }

    fn message_to_openai(message: &ChatMessage) -> Value {
        match message {
            ChatMessage::System { content } => json!({ "role": "system", "content": content }),
            ChatMessage::User { content } => json!({ "role": "user", "content": content }),
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut object = Map::new();
                object.insert("role".into(), json!("assistant"));
                object.insert(
                    "content".into(),
                    content.clone().map(Value::String).unwrap_or(Value::Null),
                );
                if !tool_calls.is_empty() {
                    object.insert(
                        "tool_calls".into(),
                        Value::Array(tool_calls.iter().map(Self::tool_call_to_openai).collect()),
                    );
                }
                Value::Object(object)
            }
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "content": content,
            }),
        }
    }

    fn tool_call_to_openai(call: &ToolCall) -> Value {
        json!({
            "id": call.id,
            "type": "function",
            "function": {
                "name": call.name,
                "arguments": call.arguments,
            }
        })
    }
}
