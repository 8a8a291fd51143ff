//! Core relay types.

use serde::{Deserialize, Serialize};

/// Conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Parse a role tag, rejecting anything but `user` and `assistant`.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged entry of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Function declaration exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Function name.
    pub name: String,

    /// What the function does and when to call it.
    pub description: String,

    /// JSON schema for the arguments.
    pub parameters: serde_json::Value,
}

/// A model request to invoke one named function.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Opaque identifier pairing this call with its result.
    pub call_id: String,

    /// Function name.
    pub name: String,

    /// Decoded arguments.
    pub arguments: serde_json::Value,
}

/// An item submitted to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    /// Fixed system instruction.
    System(String),

    /// A user or assistant turn.
    Message(Turn),

    /// Result of a previously requested tool call.
    FunctionCallOutput { call_id: String, output: String },
}

/// An item produced by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    /// Request to call a function.
    ToolCall(ToolCall),

    /// One text segment of an assistant message.
    Text(String),
}

/// A complete, non-streamed model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    /// Response identifier, used to continue the exchange.
    pub id: String,

    /// Output items in model order.
    pub output: Vec<OutputItem>,
}

impl ModelResponse {
    /// Tool calls requested by this response.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::ToolCall(call) => Some(call),
                OutputItem::Text(_) => None,
            })
            .collect()
    }

    /// Message text, segments joined by newlines and trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Text(text) if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}
