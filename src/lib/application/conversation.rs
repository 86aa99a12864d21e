//! Bounded, pairing-safe message history.

use crate::domain::types::ChatMessage;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    limit: usize,
}

impl ConversationState {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append an assistant tool-call message together with its results.
    ///
    /// Results must answer the assistant's calls one-to-one; the batch is
    /// appended as a unit so a result never lands without its request.
    pub fn append_tool_exchange(&mut self, assistant: ChatMessage, results: Vec<ChatMessage>) {
        debug_assert!(assistant.requests_tools());
        debug_assert_eq!(assistant.tool_calls().len(), results.len());
        self.messages.push(assistant);
        self.messages.extend(results);
    }

    /// Keep at most `limit` of the newest messages. The window start moves
    /// forward past any tool results whose assistant request would be cut.
    pub fn truncate(&mut self) {
        if self.messages.len() <= self.limit {
            return;
        }
        let mut start = self.messages.len() - self.limit;
        while start < self.messages.len() && self.messages[start].is_tool_result() {
            start += 1;
        }
        self.messages.drain(..start);
    }

    /// Drop everything appended after `len` messages.
    pub fn rollback(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    /// History to send to the model, with the system prompt in front.
    pub fn request_messages(&self, system_prompt: Option<&str>) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = system_prompt {
            out.push(ChatMessage::system(prompt));
        }
        out.extend(self.messages.iter().cloned());
        out
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Every tool result follows the assistant message (or its sibling results)
/// that requested it, and answers one of that message's call ids.
pub fn is_well_paired(messages: &[ChatMessage]) -> bool {
    let mut open: Option<HashSet<&str>> = None;
    for message in messages {
        if let Some(call_id) = message.tool_call_id() {
            let Some(ids) = open.as_mut() else {
                return false;
            };
            if !ids.remove(call_id) {
                return false;
            }
        } else if message.requests_tools() {
            open = Some(message.tool_calls().iter().map(|call| call.id.as_str()).collect());
        } else {
            open = None;
        }
    }
    true
}
