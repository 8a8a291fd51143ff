//! Function-calling relay between a chat model and local tool handlers.

pub mod conversation;
pub mod error;
pub mod provider;
pub mod providers;
pub mod relay;
pub mod secret;
pub mod tool;
pub mod types;

pub use conversation::Conversation;
pub use error::{AgentError, Result};
pub use provider::{ModelProvider, ResponseRequest};
pub use providers::OpenAiProvider;
pub use relay::{Relay, RelayLimits, RelayOutcome};
pub use secret::SharedSecret;
pub use tool::{ToolHandler, ToolOutcome};
pub use types::{InputItem, ModelResponse, OutputItem, Role, Tool, ToolCall, Turn};
