//! Messages exchanged with a realtime session.

use crate::tool::ToolResult;
use insight_relay_core::{RealtimeSessionId, ToolCallId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A tool invocation requested by the voice model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: JsonValue,
}

impl ToolCall {
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: ToolCallId::new(),
            name: name.into(),
            arguments,
        }
    }

    /// Reads a tool call out of an inbound message.
    ///
    /// Returns `None` unless `type` is `"tool_call"`. Missing arguments
    /// become an empty object.
    #[must_use]
    pub fn from_message(message: &JsonValue) -> Option<Self> {
        if message.get("type").and_then(JsonValue::as_str) != Some("tool_call") {
            return None;
        }
        let name = message
            .get("tool_name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        let arguments = message
            .get("arguments")
            .filter(|a| !a.is_null())
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(serde_json::Map::new()));
        Some(Self::new(name, arguments))
    }
}

/// Reply to an inbound session message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageReply {
    /// The outcome of a `tool_call` message.
    ToolResponse {
        call_id: ToolCallId,
        tool_name: String,
        result: ToolResult,
    },
    /// Any other message, echoed back.
    MessageReceived {
        session_id: RealtimeSessionId,
        message: JsonValue,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_call_parsed_from_message() {
        let call = ToolCall::from_message(&json!({
            "type": "tool_call",
            "tool_name": "verify_data_tool",
            "arguments": {"context": "Vendas", "prompt": "Quanto vendemos?"}
        }))
        .expect("is a tool call");
        assert_eq!(call.name, "verify_data_tool");
        assert_eq!(call.arguments["context"], "Vendas");
    }

    #[test]
    fn missing_arguments_default_to_empty_object() {
        let call = ToolCall::from_message(&json!({"type": "tool_call", "tool_name": "x"}))
            .expect("is a tool call");
        assert_eq!(call.arguments, json!({}));
    }

    #[test]
    fn other_types_are_not_tool_calls() {
        assert!(ToolCall::from_message(&json!({"type": "text", "text": "oi"})).is_none());
        assert!(ToolCall::from_message(&json!("plain")).is_none());
    }

    #[test]
    fn reply_is_tagged_by_type() {
        let id = RealtimeSessionId::new();
        let value = serde_json::to_value(MessageReply::MessageReceived {
            session_id: id,
            message: json!({"type": "text"}),
        })
        .expect("serializes");
        assert_eq!(value["type"], "message_received");
        assert_eq!(value["session_id"], json!(id));
    }
}
