//! The tool-call relay loop.
//!
//! One call to [`Relay::process`] submits the prompt, executes every tool
//! call the model requests, feeds the results back as a continuation of the
//! previous response and repeats until the model answers in plain text.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::conversation::Conversation;
use crate::error::{AgentError, Result};
use crate::provider::{ModelProvider, ResponseRequest};
use crate::tool::{ToolHandler, ToolOutcome};
use crate::types::{InputItem, ModelResponse, Tool, ToolCall, Turn};

/// Bounds on a single relay turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayLimits {
    /// Maximum number of tool-call rounds before giving up.
    pub max_rounds: usize,
    /// Wall-clock budget for the whole turn, model and tool calls included.
    pub timeout: Duration,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            max_rounds: 8,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Final answer of a relay turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// The model's closing text.
    pub response: String,
    /// Name of the last operation invoked, if any.
    pub function_called: Option<String>,
}

/// Drives a model through function calling against a [`ToolHandler`].
pub struct Relay {
    provider: Arc<dyn ModelProvider>,
    tools: Arc<dyn ToolHandler>,
    model: String,
    system: String,
    limits: RelayLimits,
}

impl Relay {
    /// Create a relay with default limits.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        tools: Arc<dyn ToolHandler>,
        model: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            system: system.into(),
            limits: RelayLimits::default(),
        }
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: RelayLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Relay one user utterance and return the model's final answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, the model is not configured or
    /// unreachable, the round limit is hit, or the turn times out. Tool
    /// failures are fed back to the model and never surface here.
    pub async fn process(&self, input: &str, history: &Conversation) -> Result<RelayOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AgentError::Config("input is empty".to_string()));
        }

        tracing::info!(model = %self.model, history = history.len(), "processing input");

        tokio::time::timeout(self.limits.timeout, self.run(input, history))
            .await
            .map_err(|_| AgentError::Timeout(self.limits.timeout))?
    }

    async fn run(&self, input: &str, history: &Conversation) -> Result<RelayOutcome> {
        let tools = self.tools.definitions();

        let mut items = Vec::with_capacity(history.len() + 2);
        items.push(InputItem::System(self.system.clone()));
        items.extend(history.turns().iter().cloned().map(InputItem::Message));
        items.push(InputItem::Message(Turn::user(input)));

        let mut response = self.send(items, &tools, None).await?;
        let mut function_called = None;
        let mut rounds = 0;

        loop {
            let calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                break;
            }

            if rounds >= self.limits.max_rounds {
                return Err(AgentError::LoopDetected(format!(
                    "model still requesting tools after {rounds} rounds"
                )));
            }
            rounds += 1;

            tracing::info!(round = rounds, calls = calls.len(), "processing tool calls");
            function_called = calls.last().map(|c| c.name.clone());

            let outputs = self.execute_batch(&calls).await;
            response = self.send(outputs, &tools, Some(response.id)).await?;
        }

        Ok(RelayOutcome {
            response: response.text(),
            function_called,
        })
    }

    async fn send(
        &self,
        input: Vec<InputItem>,
        tools: &[Tool],
        previous_response_id: Option<String>,
    ) -> Result<ModelResponse> {
        let request = ResponseRequest {
            model: self.model.clone(),
            input,
            tools: tools.to_vec(),
            previous_response_id,
            parallel_tool_calls: true,
        };

        let response = self.provider.respond(request).await?;
        tracing::debug!(response_id = %response.id, "model response received");
        Ok(response)
    }

    /// Run every call of one model turn concurrently and pair each result
    /// with its originating call id.
    async fn execute_batch(&self, calls: &[ToolCall]) -> Vec<InputItem> {
        let runs = calls.iter().map(|call| async move {
            tracing::info!(tool = %call.name, call_id = %call.call_id, "executing tool call");

            let outcome = AssertUnwindSafe(self.tools.call(&call.name, call.arguments.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| ToolOutcome::failure(format!("{} panicked", call.name)));

            if let ToolOutcome::Failure { error } = &outcome {
                tracing::warn!(tool = %call.name, error = %error, "tool call failed");
            }

            InputItem::FunctionCallOutput {
                call_id: call.call_id.clone(),
                output: outcome.to_output(),
            }
        });

        futures::future::join_all(runs).await
    }
}
