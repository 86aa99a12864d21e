// Chat session tests - full turns through ChatSession and the console loop

use async_trait::async_trait;
use multi_mcp_client::catalog::ToolCatalog;
use multi_mcp_client::conversation::is_well_paired;
use multi_mcp_client::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use multi_mcp_client::resolver::ResolverOptions;
use multi_mcp_client::session::{ChatSession, SessionError};
use multi_mcp_client::stdio;
use multi_mcp_client::tooling::{ServerRegistry, ServerToolInfo, ToolInvokeError, ToolServerHandle};
use multi_mcp_client::types::{ChatMessage, ToolCall};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct ScriptedProvider {
    responses: Arc<Mutex<Vec<Option<ModelResponse>>>>,
    recordings: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedProvider {
    /// `None` entries fail the request.
    fn new(responses: Vec<Option<ModelResponse>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            recordings: Arc::new(Mutex::new(Vec::new())),
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
        if responses.is_empty() {
            return Err(ModelError::invalid_response("scripted", "script exhausted"));
        }
        responses
            .remove(0)
            .ok_or_else(|| ModelError::invalid_response("scripted", "scripted failure"))
    }
}

struct WeatherServer;

#[async_trait]
impl ToolServerHandle for WeatherServer {
    fn alias(&self) -> &str {
        "weather"
    }

    async fn initialize(&self) -> Result<(), ToolInvokeError> {
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        Ok(vec![ServerToolInfo::new(
            "query_weather",
            "Look up current weather",
            json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            }),
        )])
    }

    async fn invoke(&self, _tool: &str, arguments: Map<String, Value>) -> Result<String, ToolInvokeError> {
        let city = arguments
            .get("city")
            .and_then(Value::as_str)
            .unwrap_or("somewhere");
        Ok(format!("{city}: 21°C, sunny"))
    }

    async fn shutdown(&self) -> Result<(), ToolInvokeError> {
        Ok(())
    }
}

async fn session(provider: ScriptedProvider, history_limit: usize) -> ChatSession<ScriptedProvider> {
    let mut registry = ServerRegistry::new();
    registry
        .register(Box::new(WeatherServer))
        .expect("valid alias");
    let catalog = ToolCatalog::merge(&registry).await;
    ChatSession::new(
        provider,
        registry,
        catalog,
        ResolverOptions::new("gpt-test"),
        history_limit,
    )
}

fn weather_call(id: &str, city: &str) -> ModelResponse {
    ModelResponse::tool_calls(vec![ToolCall::new(
        id,
        "weather_query_weather",
        json!({ "city": city }).to_string(),
    )])
}

#[tokio::test]
async fn turn_appends_user_exchange_and_answer() {
    let provider = ScriptedProvider::new(vec![
        Some(weather_call("call_1", "Beijing")),
        Some(ModelResponse::text("Beijing is 21°C and sunny.")),
    ]);
    let mut session = session(provider.clone(), 20).await;

    let turn = session
        .submit("what's the weather in Beijing")
        .await
        .expect("turn succeeds");

    assert_eq!(turn.answer, "Beijing is 21°C and sunny.");
    assert_eq!(turn.model_calls, 2);
    assert_eq!(turn.tool_invocations, 1);

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0], ChatMessage::user("what's the weather in Beijing"));
    assert!(messages[1].requests_tools());
    assert_eq!(
        messages[2],
        ChatMessage::tool_result("call_1", "Beijing: 21°C, sunny")
    );
    assert_eq!(messages[3], ChatMessage::assistant("Beijing is 21°C and sunny."));
    assert_eq!(session.last_steps().len(), 1);

    let requests = provider.requests().await;
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(
        requests[0].tools[0]["function"]["name"],
        json!("weather_query_weather")
    );
}

#[tokio::test]
async fn failed_turn_restores_previous_history() {
    let provider = ScriptedProvider::new(vec![
        Some(ModelResponse::text("Hello!")),
        Some(weather_call("call_2", "Paris")),
        None,
    ]);
    let mut session = session(provider, 20).await;

    session.submit("hi").await.expect("first turn");
    let before = session.conversation().messages().to_vec();

    let err = session
        .submit("weather in Paris?")
        .await
        .expect_err("model fails mid-turn");
    assert!(matches!(err, SessionError::Resolve(_)));
    assert_eq!(session.conversation().messages(), before.as_slice());
}

#[tokio::test]
async fn empty_query_is_rejected_without_model_call() {
    let provider = ScriptedProvider::new(Vec::new());
    let mut session = session(provider.clone(), 20).await;

    let err = session.submit("   ").await.expect_err("empty query");
    assert!(matches!(err, SessionError::EmptyQuery));
    assert!(provider.requests().await.is_empty());
}

#[tokio::test]
async fn history_stays_bounded_and_paired() {
    let mut script = Vec::new();
    for turn in 0..8 {
        script.push(Some(weather_call(&format!("call_{turn}"), "Beijing")));
        script.push(Some(ModelResponse::text(format!("answer {turn}"))));
    }
    let mut session = session(ScriptedProvider::new(script), 5).await;

    for turn in 0..8 {
        session
            .submit(&format!("question {turn}"))
            .await
            .expect("turn succeeds");
        let messages = session.conversation().messages();
        assert!(messages.len() <= 5);
        assert!(is_well_paired(messages));
    }
    let last = session.conversation().messages().last().expect("non-empty");
    assert_eq!(last.text(), Some("answer 7"));
}

#[tokio::test]
async fn console_loop_prints_tool_echo_and_answer() {
    let provider = ScriptedProvider::new(vec![
        Some(weather_call("call_1", "Beijing")),
        Some(ModelResponse::text("Sunny in Beijing.")),
    ]);
    let mut session = session(provider, 20).await;

    let input = BufReader::new(&b"what's the weather in Beijing\n/steps\n/tools\nquit\nnever read\n"[..]);
    let mut output = Vec::new();
    stdio::run_with_io(&mut session, input, &mut output)
        .await
        .expect("console loop");

    let printed = String::from_utf8(output).expect("utf8");
    assert!(printed.contains(r#"[calling tool weather_query_weather with {"city":"Beijing"}]"#));
    assert!(printed.contains("AI: Sunny in Beijing."));
    assert!(printed.contains("1. weather_query_weather [ok]"));
    assert!(printed.contains("weather_query_weather: Look up current weather"));
    assert_eq!(session.conversation().len(), 4);
}

#[tokio::test]
async fn console_loop_reports_errors_and_keeps_going() {
    let provider = ScriptedProvider::new(vec![None, Some(ModelResponse::text("Recovered."))]);
    let mut session = session(provider, 20).await;

    let input = BufReader::new(&b"first\nsecond\n"[..]);
    let mut output = Vec::new();
    stdio::run_with_io(&mut session, input, &mut output)
        .await
        .expect("console loop");

    let printed = String::from_utf8(output).expect("utf8");
    assert!(printed.contains("⚠️"));
    assert!(printed.contains("AI: Recovered."));
    assert!(printed.contains("Input closed"));
    assert_eq!(session.conversation().len(), 2);
}

#[tokio::test]
async fn shutdown_closes_every_server() {
    let session = session(ScriptedProvider::default(), 20).await;
    let report = session.shutdown().await;
    assert!(report.is_clean());
    assert_eq!(report.closed, vec!["weather".to_string()]);
}
