//! Conversation state management.

use std::path::Path;

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::types::{Role, Turn};

/// Ordered user/assistant turns for one palette session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create a new conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation from loosely-typed history.
    ///
    /// Accepts either a bare array of `{role, content}` entries or an object
    /// with a `messages` array. Entries that are not objects or whose role is
    /// neither `user` nor `assistant` are dropped. Non-string content is kept
    /// as its JSON encoding.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let entries = match value {
            Value::Array(entries) => entries.as_slice(),
            Value::Object(map) => map
                .get("messages")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
            _ => &[],
        };

        let turns = entries
            .iter()
            .filter_map(|entry| {
                let role = Role::parse(entry.get("role")?.as_str()?)?;
                let content = match entry.get("content") {
                    Some(Value::String(text)) => text.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                Some(Turn { role, content })
            })
            .collect();

        Self { turns }
    }

    /// Load history from a JSON file.
    ///
    /// Returns an empty conversation if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))?;
        let value: Value = serde_json::from_str(&contents)
            .map_err(|e| AgentError::Parse(format!("{}: {e}", path.display())))?;
        Ok(Self::from_value(&value))
    }

    /// Get all turns.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Add a user message.
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::user(text));
    }

    /// Add an assistant message.
    pub fn add_assistant_message(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::assistant(text));
    }

    /// Clear all turns.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }
}
