use super::*;
use crate::application::catalog::{ParameterSchema, ToolCatalog, ToolDescriptor};
use crate::application::conversation::{ConversationState, is_well_paired};
use crate::application::tooling::{ServerRegistry, ServerToolInfo, ToolInvokeError, ToolServerHandle};
use crate::domain::types::{ChatMessage, ToolCall};
use crate::infrastructure::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone)]
struct ScriptedProvider {
    responses: Arc<Mutex<Vec<Result<ModelResponse, String>>>>,
    recordings: Arc<Mutex<Vec<ModelRequest>>>,
    repeat_last: bool,
}

impl ScriptedProvider {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            recordings: Arc::new(Mutex::new(Vec::new())),
            repeat_last: false,
        }
    }

    fn forever(response: ModelResponse) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![response])
        }
    }

    fn failing(reason: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(reason.to_string())])),
            recordings: Arc::new(Mutex::new(Vec::new())),
            repeat_last: false,
        }
    }

    async fn requests(&self) -> Vec<ModelRequest> {
        self.recordings.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.recordings.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        let next = if self.repeat_last && responses.len() == 1 {
            responses[0].clone()
        } else {
            responses.remove(0)
        };
        next.map_err(|reason| ModelError::invalid_response("scripted", reason))
    }
}

struct StubHandle {
    alias: &'static str,
    output: Result<&'static str, &'static str>,
    delay: Duration,
    calls: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
}

impl StubHandle {
    fn new(alias: &'static str, output: &'static str) -> Self {
        Self {
            alias,
            output: Ok(output),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(alias: &'static str, message: &'static str) -> Self {
        Self {
            output: Err(message),
            ..Self::new(alias, "")
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ToolServerHandle for StubHandle {
    fn alias(&self) -> &str {
        self.alias
    }

    async fn initialize(&self) -> Result<(), ToolInvokeError> {
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        Ok(Vec::new())
    }

    async fn invoke(&self, tool: &str, arguments: Map<String, Value>) -> Result<String, ToolInvokeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.lock().await.push((tool.to_string(), arguments));
        match self.output {
            Ok(text) => Ok(text.to_string()),
            Err(message) => Err(ToolInvokeError::Execution {
                server: self.alias.to_string(),
                tool: tool.to_string(),
                message: message.to_string(),
            }),
        }
    }

    async fn shutdown(&self) -> Result<(), ToolInvokeError> {
        Ok(())
    }
}

fn catalog() -> ToolCatalog {
    ToolCatalog::from_descriptors(vec![
        ToolDescriptor::new(
            "weather",
            "query_weather",
            "Look up current weather for a city",
            ParameterSchema::default(),
        ),
        ToolDescriptor::new("sql", "inter", "Run a SQL query", ParameterSchema::default()),
    ])
}

fn registry(handles: Vec<StubHandle>) -> ServerRegistry {
    let mut registry = ServerRegistry::new();
    for handle in handles {
        registry.register(Box::new(handle)).expect("valid alias");
    }
    registry
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall::new(id, name, arguments)
}

fn conversation_with(query: &str) -> ConversationState {
    let mut conversation = ConversationState::new(20);
    conversation.push_user(query);
    conversation
}

fn tool_results(messages: &[ChatMessage]) -> Vec<(&str, &str)> {
    messages
        .iter()
        .filter_map(|message| match message {
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => Some((tool_call_id.as_str(), content.as_str())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn zero_tool_calls_finishes_in_one_step() {
    let provider = ScriptedProvider::new(vec![ModelResponse::text("Hello! How can I help?")]);
    let registry = registry(Vec::new());
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test");
    let mut conversation = conversation_with("hi");

    let turn = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect("resolves");

    assert_eq!(turn.answer, "Hello! How can I help?");
    assert_eq!(turn.model_calls, 1);
    assert!(turn.steps.is_empty());
    assert_eq!(conversation.len(), 1);

    let requests = provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-test");
    assert_eq!(requests[0].tools, catalog.function_definitions());
}

#[tokio::test]
async fn weather_question_takes_two_model_calls_and_one_invocation() {
    let provider = ScriptedProvider::new(vec![
        ModelResponse::tool_calls(vec![call(
            "call_1",
            "weather_query_weather",
            r#"{"city":"Beijing"}"#,
        )]),
        ModelResponse::text("It is 21°C and sunny in Beijing."),
    ]);
    let weather = StubHandle::new("weather", "Beijing: 21°C, sunny");
    let weather_calls = Arc::clone(&weather.calls);
    let registry = registry(vec![weather, StubHandle::new("sql", "[]")]);
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test");
    let mut conversation = conversation_with("what's the weather in Beijing");

    let turn = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect("resolves");

    assert_eq!(turn.model_calls, 2);
    assert_eq!(turn.tool_invocations, 1);
    assert_eq!(turn.answer, "It is 21°C and sunny in Beijing.");
    assert!(!turn.final_message.requests_tools());

    let calls = weather_calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "query_weather");
    assert_eq!(calls[0].1.get("city"), Some(&json!("Beijing")));

    let requests = provider.requests().await;
    let second = &requests[1].messages;
    assert_eq!(tool_results(second), vec![("call_1", "Beijing: 21°C, sunny")]);
    assert!(is_well_paired(conversation.messages()));
    assert_eq!(turn.steps.len(), 1);
    assert!(turn.steps[0].success);
}

#[tokio::test(start_paused = true)]
async fn batch_results_follow_request_order() {
    let provider = ScriptedProvider::new(vec![
        ModelResponse::tool_calls(vec![
            call("call_w", "weather_query_weather", r#"{"city":"Shanghai"}"#),
            call("call_s", "sql_inter", r#"{"sql":"select 1"}"#),
        ]),
        ModelResponse::text("done"),
    ]);
    let registry = registry(vec![
        StubHandle::new("weather", "Shanghai: rain").delayed(Duration::from_millis(500)),
        StubHandle::new("sql", "1 row"),
    ]);
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test");
    let mut conversation = conversation_with("weather and a query");

    let turn = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect("resolves");

    assert_eq!(
        tool_results(conversation.messages()),
        vec![("call_w", "Shanghai: rain"), ("call_s", "1 row")]
    );
    assert_eq!(turn.tool_invocations, 2);
    assert!(is_well_paired(conversation.messages()));
}

#[tokio::test]
async fn unknown_server_becomes_tool_result() {
    let provider = ScriptedProvider::new(vec![
        ModelResponse::tool_calls(vec![call("call_x", "unknownserver_foo", "{}")]),
        ModelResponse::text("Sorry, that tool is not available."),
    ]);
    let registry = registry(vec![StubHandle::new("weather", "sunny")]);
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test");
    let mut conversation = conversation_with("use foo");

    let turn = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect("unknown server does not abort the turn");

    assert_eq!(turn.model_calls, 2);
    assert_eq!(turn.tool_invocations, 0);
    let requests = provider.requests().await;
    let results = tool_results(&requests[1].messages);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call_x");
    assert!(results[0].1.contains("server not found"));
    assert!(!turn.steps[0].success);
}

#[tokio::test]
async fn malformed_arguments_and_names_are_reported_to_model() {
    let provider = ScriptedProvider::new(vec![
        ModelResponse::tool_calls(vec![
            call("call_bad", "weather_query_weather", "{bad json"),
            call("call_name", "noseparator", "{}"),
            call("call_ok", "sql_inter", ""),
        ]),
        ModelResponse::text("recovered"),
    ]);
    let registry = registry(vec![
        StubHandle::new("weather", "unused"),
        StubHandle::new("sql", "ok"),
    ]);
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test");
    let mut conversation = conversation_with("try things");

    let turn = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect("bad calls do not abort the turn");

    let results = tool_results(conversation.messages());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "call_bad");
    assert!(results[0].1.contains("invalid arguments"));
    assert_eq!(results[1].0, "call_name");
    assert!(results[1].1.contains("invalid tool name"));
    assert_eq!(results[2], ("call_ok", "ok"));
    assert_eq!(turn.tool_invocations, 1);
    assert_eq!(turn.answer, "recovered");
}

#[tokio::test]
async fn execution_errors_are_fed_back() {
    let provider = ScriptedProvider::new(vec![
        ModelResponse::tool_calls(vec![call("call_1", "sql_inter", r#"{"sql":"drop"}"#)]),
        ModelResponse::text("The query failed."),
    ]);
    let registry = registry(vec![StubHandle::failing("sql", "permission denied")]);
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test");
    let mut conversation = conversation_with("drop it");

    let turn = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect("resolves");

    let results = tool_results(conversation.messages());
    assert!(results[0].1.contains("permission denied"));
    assert_eq!(turn.tool_invocations, 1);
    assert!(!turn.steps[0].success);
}

#[tokio::test]
async fn runaway_tool_loop_is_bounded() {
    let provider = ScriptedProvider::forever(ModelResponse::tool_calls(vec![call(
        "call_loop",
        "weather_query_weather",
        r#"{"city":"Paris"}"#,
    )]));
    let registry = registry(vec![StubHandle::new("weather", "cloudy")]);
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test").with_max_tool_rounds(2);
    let mut conversation = conversation_with("loop");

    let err = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect_err("loop must stop");

    assert!(matches!(err, ResolveError::ToolLoopExceeded { limit: 2 }));
    assert_eq!(provider.requests().await.len(), 3);
}

#[tokio::test]
async fn model_failure_propagates() {
    let provider = ScriptedProvider::failing("boom");
    let registry = registry(Vec::new());
    let catalog = catalog();
    let options = ResolverOptions::new("gpt-test");
    let mut conversation = conversation_with("hello");

    let err = ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect_err("model failed");
    assert!(matches!(err, ResolveError::Model(_)));
}

#[tokio::test]
async fn system_prompt_leads_every_request() {
    let provider = ScriptedProvider::new(vec![
        ModelResponse::tool_calls(vec![call("c1", "weather_query_weather", "{}")]),
        ModelResponse::text("ok"),
    ]);
    let registry = registry(vec![StubHandle::new("weather", "sunny")]);
    let catalog = catalog();
    let options =
        ResolverOptions::new("gpt-test").with_system_prompt(Some("You are a helpful assistant.".into()));
    let mut conversation = conversation_with("weather?");

    ToolCallResolver::new(&provider, &catalog, &registry, &options)
        .resolve(&mut conversation)
        .await
        .expect("resolves");

    for request in provider.requests().await {
        assert_eq!(
            request.messages[0],
            ChatMessage::system("You are a helpful assistant.")
        );
    }
    assert!(
        conversation
            .messages()
            .iter()
            .all(|message| !matches!(message, ChatMessage::System { .. }))
    );
}
