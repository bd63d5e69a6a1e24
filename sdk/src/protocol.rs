//! Client wire protocol
//!
//! Every frame exchanged with a connected viewer is a JSON object with a
//! mandatory `type` tag. Inbound frames decode into the closed
//! [`ClientMessage`] enum; anything that does not decode (unknown `type`,
//! missing fields, blank chat text) is rejected here, before any handler runs.
//!
//! Every outbound `map_state` is a full snapshot, never a delta, so a client
//! can resynchronize from any single message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MapState, ToolOutcome, ToolResult};

/// Messages sent by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a conversation turn with the given user text
    ChatMessage { content: String },

    /// Liveness probe; answered with [`ServerMessage::Pong`]
    Ping,
}

/// Errors produced while decoding an inbound frame
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Chat message content is empty")]
    EmptyContent,
}

impl ClientMessage {
    /// Decode and validate a text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let message: ClientMessage =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        match message {
            ClientMessage::ChatMessage { content } => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    return Err(ProtocolError::EmptyContent);
                }
                Ok(ClientMessage::ChatMessage {
                    content: trimmed.to_string(),
                })
            }
            ClientMessage::Ping => Ok(ClientMessage::Ping),
        }
    }
}

/// Messages sent to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Intermediate result of one tool call within a turn
    ToolProgress {
        tool: String,
        outcome: ToolOutcome,
        summary: String,
        map_state: MapState,
    },

    /// Final answer of a turn
    AssistantMessage {
        content: String,
        map_state: MapState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },

    /// User-safe failure description
    Error { summary: String },

    /// Current state, sent to a client right after it connects
    StateSync { map_state: MapState },

    /// Reply to [`ClientMessage::Ping`]
    Pong,
}

impl ServerMessage {
    /// Build a progress notification from a tool result.
    ///
    /// `current` is used when the result carries no snapshot (failed calls
    /// leave the map untouched, so the current state is still accurate).
    pub fn tool_progress(result: &ToolResult, current: MapState) -> Self {
        ServerMessage::ToolProgress {
            tool: result.tool.clone(),
            outcome: result.outcome,
            summary: result.summary.clone(),
            map_state: result.state_snapshot.unwrap_or(current),
        }
    }

    /// Build an error message
    pub fn error(summary: impl Into<String>) -> Self {
        ServerMessage::Error {
            summary: summary.into(),
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Snapshot carried by this message, if any
    pub fn map_state(&self) -> Option<&MapState> {
        match self {
            ServerMessage::ToolProgress { map_state, .. }
            | ServerMessage::AssistantMessage { map_state, .. }
            | ServerMessage::StateSync { map_state } => Some(map_state),
            ServerMessage::Error { .. } | ServerMessage::Pong => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LastAction;

    #[test]
    fn test_decode_chat_message() {
        let msg = ClientMessage::decode(r#"{"type": "chat_message", "content": "  zoom to 5 "}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::ChatMessage {
                content: "zoom to 5".to_string()
            }
        );
    }

    #[test]
    fn test_decode_ping() {
        assert_eq!(
            ClientMessage::decode(r#"{"type": "ping"}"#).unwrap(),
            ClientMessage::Ping
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let err = ClientMessage::decode(r#"{"type": "teleport", "content": "x"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_missing_type() {
        let err = ClientMessage::decode(r#"{"content": "hello"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_missing_content() {
        let err = ClientMessage::decode(r#"{"type": "chat_message"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_blank_content() {
        let err = ClientMessage::decode(r#"{"type": "chat_message", "content": "   "}"#)
            .unwrap_err();
        assert_eq!(err, ProtocolError::EmptyContent);
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(ClientMessage::decode("not json").is_err());
    }

    #[test]
    fn test_tool_progress_shape() {
        let state = MapState::initial(1.0, 2.0, 3).with_position(4.0, 5.0, LastAction::Navigate);
        let result = ToolResult::success("navigate", "Moved", state);
        let msg = ServerMessage::tool_progress(&result, MapState::initial(0.0, 0.0, 0));

        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "tool_progress");
        assert_eq!(json["tool"], "navigate");
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["map_state"]["latitude"], 4.0);
        assert_eq!(json["map_state"]["last_action"], "navigate");
    }

    #[test]
    fn test_failed_tool_progress_uses_current_state() {
        let current = MapState::initial(9.0, 9.0, 9);
        let result = ToolResult::failure("navigate", "out of range");
        let msg = ServerMessage::tool_progress(&result, current);
        assert_eq!(msg.map_state(), Some(&current));
    }

    #[test]
    fn test_assistant_message_omits_missing_reasoning() {
        let msg = ServerMessage::AssistantMessage {
            content: "Done".to_string(),
            map_state: MapState::initial(0.0, 0.0, 2),
            reasoning: None,
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"assistant_message""#));
        assert!(!json.contains("reasoning"));
    }

    #[test]
    fn test_error_shape() {
        let json = ServerMessage::error("Sorry").to_json().unwrap();
        assert_eq!(json, r#"{"type":"error","summary":"Sorry"}"#);
    }
}
