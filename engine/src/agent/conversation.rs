//! Per-turn conversation history
//!
//! Holds the ordered messages of one user turn: system prompt, the user
//! request, then alternating assistant tool-call messages and tool results.
//! Every tool message directly follows the assistant message that requested
//! it, which OpenAI-compatible endpoints require.

use sdk::types::ToolResult;

use crate::llm::{Message, MessageRole, ToolCall};

/// Rough estimate: 1 token ≈ 4 characters
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    token_estimate: usize,
}

impl Conversation {
    /// Start a turn with the system prompt and the user's request
    pub fn start(system_prompt: &str, user_text: &str) -> Self {
        let mut conversation = Self::default();
        conversation.add_message(Message::system(system_prompt));
        conversation.add_message(Message::user(user_text));
        conversation
    }

    pub fn add_message(&mut self, message: Message) {
        self.token_estimate += Self::estimate_tokens(&message);
        self.messages.push(message);
    }

    /// Record the model's tool-call request for this round
    pub fn add_tool_calls(&mut self, content: Option<&str>, calls: &[ToolCall]) {
        self.add_message(Message::assistant_tool_calls(
            content.unwrap_or_default(),
            calls.to_vec(),
        ));
    }

    /// Record a tool result as structured JSON for the model to read
    pub fn add_tool_result(&mut self, call: &ToolCall, result: &ToolResult) {
        let content =
            serde_json::to_string(result).unwrap_or_else(|_| result.summary.clone());
        self.add_message(Message::tool_result(content, &call.id));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of tool results recorded so far
    pub fn tool_result_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .count()
    }

    pub fn token_estimate(&self) -> usize {
        self.token_estimate
    }

    fn estimate_tokens(message: &Message) -> usize {
        let call_chars: usize = message
            .tool_calls
            .iter()
            .map(|c| c.name.len() + c.arguments.len())
            .sum();
        let id_chars = message.tool_call_id.as_ref().map(|id| id.len()).unwrap_or(0);

        // Role and structure overhead
        let overhead = 10;

        (message.content.len() + call_chars + id_chars).div_ceil(CHARS_PER_TOKEN) + overhead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::MapState;

    #[test]
    fn test_start_has_system_then_user() {
        let conversation = Conversation::start("You control a map", "show me Paris");
        let roles: Vec<MessageRole> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::System, MessageRole::User]);
        assert!(conversation.token_estimate() > 0);
    }

    #[test]
    fn test_tool_result_follows_its_call() {
        let mut conversation = Conversation::start("sys", "zoom to 3");
        let call = ToolCall::new("call_9", "zoom", r#"{"level":3}"#);
        conversation.add_tool_calls(None, std::slice::from_ref(&call));

        let result = ToolResult::success("zoom", "Zoomed to level 3", MapState::initial(0.0, 0.0, 3));
        conversation.add_tool_result(&call, &result);

        let messages = conversation.messages();
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[2].tool_calls[0].id, "call_9");
        assert_eq!(messages[3].role, MessageRole::Tool);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_9"));

        let body: serde_json::Value = serde_json::from_str(&messages[3].content).unwrap();
        assert_eq!(body["outcome"], "success");
        assert_eq!(body["state_snapshot"]["zoom"], 3);
        assert_eq!(conversation.tool_result_count(), 1);
    }
}
