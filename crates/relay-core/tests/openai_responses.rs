//! Responses API wire format, exercised against a mock server.

use relay_core::{
    AgentError, InputItem, ModelProvider, OpenAiProvider, OutputItem, ResponseRequest, SharedSecret,
    Tool, ToolCall, Turn,
};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer, key: Option<&str>) -> OpenAiProvider {
    OpenAiProvider::new(SharedSecret::new(key.map(str::to_string))).with_base_url(server.uri())
}

fn request(input: Vec<InputItem>, previous: Option<&str>) -> ResponseRequest {
    ResponseRequest {
        model: "gpt-5-mini".to_string(),
        input,
        tools: vec![Tool {
            name: "add_task".to_string(),
            description: "Create a task".to_string(),
            parameters: json!({"type": "object", "properties": {"name": {"type": "string"}}}),
        }],
        previous_response_id: previous.map(str::to_string),
        parallel_tool_calls: true,
    }
}

async fn sent_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    serde_json::from_slice(&requests[0].body).unwrap()
}

#[tokio::test]
async fn first_request_carries_prompt_and_tools() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_1",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{"type": "output_text", "text": "Hello!"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server, Some("sk-test"))
        .respond(request(
            vec![
                InputItem::System("You manage tasks.".to_string()),
                InputItem::Message(Turn::assistant("Earlier reply")),
                InputItem::Message(Turn::user("hi")),
            ],
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.id, "resp_1");
    assert_eq!(response.text(), "Hello!");

    let body = sent_body(&server).await;
    assert_eq!(body["model"], "gpt-5-mini");
    assert_eq!(body["parallel_tool_calls"], true);
    assert!(body.get("previous_response_id").is_none());
    assert_eq!(body["input"][0]["role"], "system");
    assert_eq!(body["input"][0]["content"][0]["type"], "input_text");
    assert_eq!(body["input"][1]["content"][0]["type"], "output_text");
    assert_eq!(body["input"][2]["content"][0]["text"], "hi");
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(body["tools"][0]["name"], "add_task");
}

#[tokio::test]
async fn continuation_sends_outputs_and_parses_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_2",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "function_call", "id": "fc_1", "call_id": "call_1",
                 "name": "add_task", "arguments": "{\"name\":\"Buy milk\"}"},
                {"type": "tool_call", "id": "fc_2", "name": "list_tasks",
                 "arguments": "{not json"}
            ]
        })))
        .mount(&server)
        .await;

    let response = provider(&server, Some("sk-test"))
        .respond(request(
            vec![InputItem::FunctionCallOutput {
                call_id: "call_0".to_string(),
                output: "Task added successfully.".to_string(),
            }],
            Some("resp_1"),
        ))
        .await
        .unwrap();

    assert_eq!(
        response.output,
        vec![
            OutputItem::ToolCall(ToolCall {
                call_id: "call_1".to_string(),
                name: "add_task".to_string(),
                arguments: json!({"name": "Buy milk"}),
            }),
            OutputItem::ToolCall(ToolCall {
                call_id: "fc_2".to_string(),
                name: "list_tasks".to_string(),
                arguments: json!({"__raw_arguments": "{not json"}),
            }),
        ]
    );

    let body = sent_body(&server).await;
    assert_eq!(body["previous_response_id"], "resp_1");
    assert_eq!(
        body["input"],
        json!([{"type": "function_call_output", "call_id": "call_0",
                "output": "Task added successfully."}])
    );
}

#[tokio::test]
async fn upstream_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server, Some("sk-bad"))
        .respond(request(vec![InputItem::Message(Turn::user("hi"))], None))
        .await
        .unwrap_err();

    match err {
        AgentError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn echoed_key_is_masked_in_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided: sk-abcdefghijklmnopqrstuvwx"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server, Some("sk-abcdefghijklmnopqrstuvwx"))
        .respond(request(vec![InputItem::Message(Turn::user("hi"))], None))
        .await
        .unwrap_err();

    let shown = err.to_string();
    assert!(shown.contains("Incorrect API key provided: [MASKED_API_KEY]"));
    assert!(!shown.contains("abcdefghijklmnop"));
}

#[tokio::test]
async fn unparseable_error_uses_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = provider(&server, Some("sk-test"))
        .respond(request(vec![InputItem::Message(Turn::user("hi"))], None))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AgentError::Api { status: 502, ref message } if message == "OpenAI API request failed (502)")
    );
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server, None)
        .respond(request(vec![InputItem::Message(Turn::user("hi"))], None))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::ApiKeyMissing));
}

#[tokio::test]
async fn swapped_key_is_used_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer sk-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "r", "output": []})))
        .expect(1)
        .mount(&server)
        .await;

    let key = SharedSecret::default();
    let provider = OpenAiProvider::new(key.clone()).with_base_url(server.uri());
    key.set("sk-new");

    let response = provider
        .respond(request(vec![InputItem::Message(Turn::user("hi"))], None))
        .await
        .unwrap();
    assert_eq!(response.text(), "");
}
