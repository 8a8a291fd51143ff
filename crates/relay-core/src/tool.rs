//! Tool handler seam and the uniform tool result type.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Tool;

/// Result of executing one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The operation succeeded with a string or structured payload.
    Success(Value),

    /// The operation failed; the message is fed back to the model.
    Failure { error: String },
}

impl ToolOutcome {
    /// A plain-text success.
    #[must_use]
    pub fn text(message: impl Into<String>) -> Self {
        Self::Success(Value::String(message.into()))
    }

    /// A failure carrying `error`.
    #[must_use]
    pub fn failure(error: impl ToString) -> Self {
        Self::Failure {
            error: error.to_string(),
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Serialize for the model: strings verbatim, everything else as JSON.
    #[must_use]
    pub fn to_output(&self) -> String {
        match self {
            Self::Success(Value::String(text)) => text.clone(),
            Self::Success(value) => value.to_string(),
            Self::Failure { error } => serde_json::json!({ "error": error }).to_string(),
        }
    }
}

impl<E: std::error::Error> From<Result<Value, E>> for ToolOutcome {
    fn from(result: Result<Value, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::failure(e),
        }
    }
}

/// A catalog of operations the model may call.
///
/// Calls within one model turn may run concurrently, so implementations
/// must not assume another call of the same batch has completed.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Function declarations exposed to the model.
    fn definitions(&self) -> Vec<Tool>;

    /// Execute `name` with `arguments`. Failures are returned, never raised.
    async fn call(&self, name: &str, arguments: Value) -> ToolOutcome;
}
