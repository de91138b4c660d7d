use serde::{Deserialize, Serialize};

use crate::ids::ToolCallId;
use crate::normalize;

/// One recorded entry of a conversation, tagged by the role that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: TurnContent,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: ToolCallId,
        name: String,
        content: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Assistant content as the reasoning engine produced it: either a plain
/// string or an ordered list of typed segments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Segments(Vec<Segment>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text { text: String },
    /// Any segment kind that carries no displayable text (thinking, images, ...).
    #[serde(other)]
    Other,
}

/// A request from the reasoning engine to invoke one capability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: ToolCallId::new(),
            name: name.into(),
            arguments,
        }
    }
}

// --- Convenience constructors ---

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Turn::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: TurnContent) -> Self {
        Turn::Assistant {
            content,
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::assistant(TurnContent::Text(text.into()))
    }

    pub fn assistant_tool_calls(text: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Turn::Assistant {
            content: TurnContent::Text(text.into()),
            tool_calls: calls,
        }
    }

    pub fn tool_result(
        tool_call_id: ToolCallId,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Turn::Tool {
            tool_call_id,
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::System { .. } => Role::System,
            Turn::User { .. } => Role::User,
            Turn::Assistant { .. } => Role::Assistant,
            Turn::Tool { .. } => Role::Tool,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Turn::System { .. })
    }

    /// Display text of the turn; assistant segments are flattened.
    pub fn text(&self) -> String {
        match self {
            Turn::System { content } | Turn::User { content } | Turn::Tool { content, .. } => {
                content.clone()
            }
            Turn::Assistant { content, .. } => normalize::normalize(content),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Turn::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        TurnContent::Text(text.to_string())
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        TurnContent::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_turn_serializes_with_role_tag() {
        let json = serde_json::to_value(Turn::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn assistant_text_omits_empty_tool_calls() {
        let json = serde_json::to_value(Turn::assistant_text("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn assistant_segments_deserialize() {
        let turn: Turn = serde_json::from_value(serde_json::json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "A"},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "B"}
            ]
        }))
        .unwrap();

        match &turn {
            Turn::Assistant { content: TurnContent::Segments(segments), .. } => {
                assert_eq!(segments.len(), 3);
                assert_eq!(segments[1], Segment::Other);
            }
            other => panic!("expected segmented assistant turn, got {other:?}"),
        }
        assert_eq!(turn.text(), "AB");
    }

    #[test]
    fn tool_result_carries_call_metadata() {
        let id = ToolCallId::new();
        let turn = Turn::tool_result(id.clone(), "consult_memory", "empty");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], id.as_str());
        assert_eq!(json["name"], "consult_memory");
        assert_eq!(turn.role(), Role::Tool);
    }

    #[test]
    fn tool_calls_accessor() {
        let call = ToolCall::new("list_events", serde_json::json!({}));
        let turn = Turn::assistant_tool_calls("Checking.", vec![call.clone()]);
        assert_eq!(turn.tool_calls(), &[call]);
        assert_eq!(turn.text(), "Checking.");
        assert!(Turn::user("x").tool_calls().is_empty());
    }

    #[test]
    fn tool_call_arguments_default_to_null() {
        let call: ToolCall =
            serde_json::from_value(serde_json::json!({"id": "call_1", "name": "clear_memory"}))
                .unwrap();
        assert!(call.arguments.is_null());
    }

    #[test]
    fn roles() {
        assert_eq!(Turn::system("s").role(), Role::System);
        assert!(Turn::system("s").is_system());
        assert_eq!(Turn::user("u").role(), Role::User);
        assert_eq!(Turn::assistant_text("a").role(), Role::Assistant);
    }
}
