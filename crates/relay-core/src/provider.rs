//! Model provider abstraction.

use async_trait::async_trait;

use super::error::Result;
use super::types::{InputItem, ModelResponse, Tool};

/// A single request to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRequest {
    /// Model identifier.
    pub model: String,
    /// Items to submit: the full prompt on the first call, tool outputs on continuations.
    pub input: Vec<InputItem>,
    /// Functions the model may call.
    pub tools: Vec<Tool>,
    /// Prior response this request continues, so history is not resent.
    pub previous_response_id: Option<String>,
    /// Allow the model to request several calls in one turn.
    pub parallel_tool_calls: bool,
}

/// Trait for model providers.
///
/// Implement this trait to drive the relay against a different backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Submit a request and wait for the complete response.
    async fn respond(&self, request: ResponseRequest) -> Result<ModelResponse>;
}
