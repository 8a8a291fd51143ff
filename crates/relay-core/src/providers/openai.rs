//! `OpenAI` provider implementation.
//!
//! Talks to the Responses API. Continuations reference the previous
//! response id so the conversation is kept server-side.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::provider::{ModelProvider, ResponseRequest};
use crate::secret::{SharedSecret, mask_secrets};
use crate::types::{InputItem, ModelResponse, OutputItem, Role, Tool, ToolCall};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model provider for the `OpenAI` Responses API.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: SharedSecret,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a provider reading its key from `api_key` on every request.
    #[must_use]
    pub fn new(api_key: SharedSecret) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different endpoint (proxies, compatible servers, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

// Responses API request types

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<WireInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    parallel_tool_calls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireInput {
    Message {
        role: &'static str,
        content: Vec<WireContent>,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    InputText { text: String },
    OutputText { text: String },
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    name: String,
    description: String,
    parameters: Value,
}

// Responses API response types

#[derive(Debug, Deserialize)]
struct ResponsesBody {
    id: String,
    #[serde(default)]
    output: Vec<WireOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireOutput {
    #[serde(alias = "tool_call")]
    FunctionCall {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        call_id: Option<String>,
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: Option<Value>,
        #[serde(default)]
        input: Option<Value>,
    },
    Message {
        #[serde(default)]
        content: Vec<WireOutputContent>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireOutputContent {
    #[serde(alias = "text")]
    OutputText {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Convert our input items to the Responses API format.
fn convert_input(items: Vec<InputItem>) -> Vec<WireInput> {
    items
        .into_iter()
        .map(|item| match item {
            InputItem::System(text) => WireInput::Message {
                role: "system",
                content: vec![WireContent::InputText { text }],
            },
            InputItem::Message(turn) => {
                let content = match turn.role {
                    Role::User => WireContent::InputText { text: turn.content },
                    Role::Assistant => WireContent::OutputText { text: turn.content },
                };
                WireInput::Message {
                    role: turn.role.as_str(),
                    content: vec![content],
                }
            }
            InputItem::FunctionCallOutput { call_id, output } => {
                WireInput::FunctionCallOutput { call_id, output }
            }
        })
        .collect()
}

/// Convert our tools to the function declaration format.
fn convert_tools(tools: Vec<Tool>) -> Vec<WireTool> {
    tools
        .into_iter()
        .map(|t| WireTool {
            tool_type: "function",
            name: t.name,
            description: t.description,
            parameters: t.parameters,
        })
        .collect()
}

/// Decode call arguments, which usually arrive as a JSON-encoded string.
///
/// Undecodable text is handed on as `{"__raw_arguments": text}` so the
/// handler can report it instead of the whole turn failing.
fn decode_arguments(arguments: Option<Value>, input: Option<Value>) -> Value {
    match arguments {
        Some(Value::String(raw)) if raw.trim().is_empty() => Value::Object(serde_json::Map::new()),
        Some(Value::String(raw)) => serde_json::from_str(&raw)
            .unwrap_or_else(|_| serde_json::json!({ "__raw_arguments": raw })),
        Some(value @ Value::Object(_)) => value,
        _ => match input {
            Some(value @ Value::Object(_)) => value,
            _ => Value::Object(serde_json::Map::new()),
        },
    }
}

fn convert_output(body: ResponsesBody) -> ModelResponse {
    let mut output = Vec::new();

    for item in body.output {
        match item {
            WireOutput::FunctionCall {
                id,
                call_id,
                name,
                arguments,
                input,
            } => {
                let call_id = call_id
                    .or(id)
                    .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
                output.push(OutputItem::ToolCall(ToolCall {
                    call_id,
                    name,
                    arguments: decode_arguments(arguments, input),
                }));
            }
            WireOutput::Message { content } => {
                for part in content {
                    if let WireOutputContent::OutputText { text } = part {
                        output.push(OutputItem::Text(text));
                    }
                }
            }
            WireOutput::Other => {}
        }
    }

    ModelResponse {
        id: body.id,
        output,
    }
}

/// Pull a readable message out of an error response body.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| format!("OpenAI API request failed ({status})"),
        |b| b.error.message,
    )
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn respond(&self, request: ResponseRequest) -> Result<ModelResponse> {
        let api_key = self.api_key.get().ok_or(AgentError::ApiKeyMissing)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| AgentError::ApiKeyMissing)?,
        );

        let body = ResponsesRequest {
            model: request.model,
            input: convert_input(request.input),
            tools: convert_tools(request.tools),
            parallel_tool_calls: request.parallel_tool_calls,
            previous_response_id: request.previous_response_id,
        };

        let url = format!("{}/responses", self.base_url);
        tracing::debug!(
            url = %url,
            items = body.input.len(),
            continuation = body.previous_response_id.is_some(),
            "sending model request"
        );

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %mask_secrets(&text), "model request failed");
            return Err(AgentError::Api {
                status: status.as_u16(),
                message: mask_secrets(&error_message(status.as_u16(), &text)).into_owned(),
            });
        }

        let body: ResponsesBody =
            serde_json::from_str(&text).map_err(|e| AgentError::Parse(e.to_string()))?;
        tracing::debug!(response_id = %body.id, items = body.output.len(), "model responded");

        Ok(convert_output(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Turn;

    #[test]
    fn provider_name_is_openai() {
        let provider = OpenAiProvider::new(SharedSecret::default());
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn default_base_url() {
        let provider = OpenAiProvider::new(SharedSecret::default());
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn custom_base_url_drops_trailing_slash() {
        let provider =
            OpenAiProvider::new(SharedSecret::default()).with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let provider =
            OpenAiProvider::new(SharedSecret::default()).with_base_url("http://127.0.0.1:9");
        let request = ResponseRequest {
            model: "gpt-5-mini".to_string(),
            input: vec![],
            tools: vec![],
            previous_response_id: None,
            parallel_tool_calls: true,
        };

        let err = provider.respond(request).await.unwrap_err();
        assert!(matches!(err, AgentError::ApiKeyMissing));
    }

    #[test]
    fn convert_input_tags_roles() {
        let wire = convert_input(vec![
            InputItem::System("sys".to_string()),
            InputItem::Message(Turn::user("hi")),
            InputItem::Message(Turn::assistant("hello")),
            InputItem::FunctionCallOutput {
                call_id: "call_1".to_string(),
                output: "ok".to_string(),
            },
        ]);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[0]["content"][0]["type"], "input_text");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[2]["role"], "assistant");
        assert_eq!(json[2]["content"][0]["type"], "output_text");
        assert_eq!(json[3]["type"], "function_call_output");
        assert_eq!(json[3]["call_id"], "call_1");
        assert_eq!(json[3]["output"], "ok");
    }

    #[test]
    fn convert_tools_produces_function_type() {
        let tools = vec![Tool {
            name: "test_tool".to_string(),
            description: "A test tool".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];

        let wire = convert_tools(tools);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].tool_type, "function");
        assert_eq!(wire[0].name, "test_tool");
    }

    #[test]
    fn decode_arguments_handles_shapes() {
        assert_eq!(
            decode_arguments(Some(Value::String(r#"{"id":"t1"}"#.to_string())), None),
            serde_json::json!({"id": "t1"})
        );
        assert_eq!(
            decode_arguments(Some(Value::String("{oops".to_string())), None),
            serde_json::json!({"__raw_arguments": "{oops"})
        );
        assert_eq!(
            decode_arguments(Some(serde_json::json!({"q": "x"})), None),
            serde_json::json!({"q": "x"})
        );
        assert_eq!(
            decode_arguments(None, Some(serde_json::json!({"list": "next"}))),
            serde_json::json!({"list": "next"})
        );
        assert_eq!(decode_arguments(None, None), serde_json::json!({}));
    }

    #[test]
    fn convert_output_reads_calls_and_text() {
        let body: ResponsesBody = serde_json::from_value(serde_json::json!({
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "function_call", "id": "fc_1", "call_id": "call_1",
                 "name": "search_tasks", "arguments": "{\"query\":\"milk\"}"},
                {"type": "tool_call", "id": "fc_2", "name": "list_tasks",
                 "arguments": "{\"list\":\"next\"}"},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "Searching"},
                    {"type": "refusal", "refusal": "no"}
                ]}
            ]
        }))
        .unwrap();

        let response = convert_output(body);
        let calls = response.tool_calls();

        assert_eq!(response.id, "resp_1");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].call_id, "call_1");
        assert_eq!(calls[0].arguments, serde_json::json!({"query": "milk"}));
        assert_eq!(calls[1].call_id, "fc_2");
        assert_eq!(response.text(), "Searching");
    }

    #[test]
    fn convert_output_generates_missing_call_id() {
        let body: ResponsesBody = serde_json::from_value(serde_json::json!({
            "id": "resp_1",
            "output": [{"type": "function_call", "name": "add_task", "arguments": "{}"}]
        }))
        .unwrap();

        let response = convert_output(body);
        assert!(!response.tool_calls()[0].call_id.is_empty());
    }

    #[test]
    fn error_message_prefers_upstream_detail() {
        assert_eq!(
            error_message(401, r#"{"error":{"message":"Incorrect API key provided"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(
            error_message(502, "<html>bad gateway</html>"),
            "OpenAI API request failed (502)"
        );
    }
}
