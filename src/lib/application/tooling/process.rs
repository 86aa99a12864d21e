use super::error::ToolInvokeError;
use super::interface::{ServerToolInfo, ToolServerHandle};
use crate::config::ServerConfig;
use crate::constants::{EMPTY_TOOL_OUTPUT, PROTOCOL_VERSION};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

/// Upper bound on `tools/list` pages followed for one server.
const MAX_LIST_PAGES: usize = 32;

/// Tool server reached over a child process's stdin/stdout with
/// newline-delimited JSON-RPC.
#[derive(Clone)]
pub struct McpProcess {
    inner: Arc<McpProcessInner>,
}

struct McpProcessInner {
    server: ServerConfig,
    phase: AsyncMutex<Phase>,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<HashMap<String, oneshot::Sender<Result<Value, ToolInvokeError>>>>,
    // One request in flight per server: the channel has no multiplexing.
    request_gate: AsyncMutex<()>,
    id_counter: AtomicU64,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Ready,
    Closed { reason: String },
}

impl McpProcess {
    pub fn new(server: ServerConfig) -> Self {
        Self {
            inner: Arc::new(McpProcessInner {
                server,
                phase: AsyncMutex::new(Phase::Idle),
                child: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                pending: AsyncMutex::new(HashMap::new()),
                request_gate: AsyncMutex::new(()),
                id_counter: AtomicU64::new(1),
            }),
        }
    }
}

#[async_trait]
impl ToolServerHandle for McpProcess {
    fn alias(&self) -> &str {
        &self.inner.server.name
    }

    async fn initialize(&self) -> Result<(), ToolInvokeError> {
        let _gate = self.inner.request_gate.lock().await;
        self.inner.initialize().await
    }

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        let _gate = self.inner.request_gate.lock().await;
        self.inner.ensure_ready().await?;
        self.inner.list_tools().await
    }

    async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ToolInvokeError> {
        let _gate = self.inner.request_gate.lock().await;
        self.inner.ensure_ready().await?;
        self.inner.call_tool(tool, arguments).await
    }

    async fn shutdown(&self) -> Result<(), ToolInvokeError> {
        self.inner.reset("shut down").await
    }
}

impl McpProcessInner {
    async fn ensure_ready(&self) -> Result<(), ToolInvokeError> {
        match &*self.phase.lock().await {
            Phase::Ready => Ok(()),
            Phase::Idle => Err(ToolInvokeError::NotInitialized {
                server: self.server.name.clone(),
            }),
            Phase::Closed { reason } => Err(self.unavailable(reason.clone())),
        }
    }

    async fn initialize(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        match &*self.phase.lock().await {
            Phase::Ready => return Ok(()),
            Phase::Closed { reason } => return Err(self.unavailable(reason.clone())),
            Phase::Idle => {}
        }

        let mut command = Command::new(&self.server.command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.server.workdir {
            command.current_dir(dir);
        }
        if !self.server.args.is_empty() {
            command.args(&self.server.args);
        }
        for (key, value) in &self.server.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: self.server.name.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdout"))?;

        *self.writer.lock().await = Some(BufWriter::new(stdin));
        *self.child.lock().await = Some(child);

        let reader_self = Arc::clone(self);
        tokio::spawn(async move {
            reader_self.reader_loop(stdout).await;
        });

        match self.initialize_sequence().await {
            Ok(()) => {
                let mut phase = self.phase.lock().await;
                if let Phase::Closed { reason } = &*phase {
                    return Err(self.unavailable(reason.clone()));
                }
                *phase = Phase::Ready;
                info!(server = %self.server.name, "MCP server initialized");
                Ok(())
            }
            Err(err) => {
                let _ = self.reset("initialize handshake failed").await;
                Err(err)
            }
        }
    }

    async fn initialize_sequence(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params).await?;
        if let Some(version) = init_result.get("protocolVersion").and_then(Value::as_str) {
            debug!(server = %self.server.name, version, "MCP server negotiated protocol");
        }
        self.send_notification("notifications/initialized", json!({}))
            .await
    }

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_LIST_PAGES {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.send_request("tools/list", params).await?;
            if let Some(array) = result.get("tools").and_then(Value::as_array) {
                tools.extend(array.iter().map(parse_tool_info));
            }
            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        if cursor.is_some() {
            warn!(
                server = %self.server.name,
                pages = MAX_LIST_PAGES,
                "Tool listing still had more pages; keeping the tools listed so far"
            );
        }
        debug!(server = %self.server.name, count = tools.len(), "Listed tools");
        Ok(tools)
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": Value::Object(arguments),
        });
        let result = match self.send_request("tools/call", params).await {
            Ok(result) => result,
            Err(ToolInvokeError::Rpc { code, message, .. }) => {
                return Err(self.execution_error(tool, format!("JSON-RPC error {code}: {message}")));
            }
            Err(err) => return Err(err),
        };

        let text = extract_text(&result);
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if is_error {
            let message = text.unwrap_or_else(|| "tool reported an error".to_string());
            return Err(self.execution_error(tool, message));
        }
        Ok(text.unwrap_or_else(|| EMPTY_TOOL_OUTPUT.to_string()))
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('\u{1b}') {
                debug!(
                    server = %self.server.name,
                    line = trimmed,
                    "skipping non-JSON ANSI log line from MCP server"
                );
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    if let Err(err) = self.process_inbound_message(value).await {
                        warn!(
                            server = %self.server.name,
                            %err,
                            "failed to process message from MCP server"
                        );
                    }
                }
                Err(source) => {
                    warn!(
                        server = %self.server.name,
                        line = trimmed,
                        %source,
                        "received invalid JSON from MCP server"
                    );
                }
            }
        }

        let _ = self.reset("transport closed").await;
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, value).await,
            (Some(id), false) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, true) => {
                if let Some(method) = value.get("method").and_then(Value::as_str) {
                    debug!(server = %self.server.name, method, "received notification from server");
                }
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };

        let responder = self.pending.lock().await.remove(&key);
        let Some(sender) = responder else {
            debug!(
                server = %self.server.name,
                response_id = key,
                "received response for unknown request"
            );
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => {
                let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32000);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                Err(ToolInvokeError::Rpc {
                    server: self.server.name.clone(),
                    code,
                    message,
                })
            }
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if method == "ping" {
            return self
                .write_message(&json!({ "jsonrpc": "2.0", "id": id, "result": {} }))
                .await;
        }

        warn!(
            server = %self.server.name,
            method,
            "server sent unsupported request"
        );
        self.write_message(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "code": -32601,
                "message": format!("client does not implement method '{method}'"),
            }
        }))
        .await
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.unavailable("request dropped before a response arrived")),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        self.write_message(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        }))
        .await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.server.name.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| self.unavailable("channel is closed"))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))
    }

    /// Close the channel, reap the child and fail every waiting request.
    async fn reset(&self, reason: &str) -> Result<(), ToolInvokeError> {
        {
            let mut phase = self.phase.lock().await;
            if !matches!(*phase, Phase::Closed { .. }) {
                *phase = Phase::Closed {
                    reason: reason.to_string(),
                };
            }
        }

        self.writer.lock().await.take();

        let running = self.child.lock().await.take();
        let mut outcome = Ok(());
        if let Some(mut child) = running {
            if let Err(err) = child.start_kill() {
                debug!(
                    server = %self.server.name,
                    %err,
                    "failed to kill MCP server process (may have already exited)"
                );
            }
            if let Err(err) = child.wait().await {
                outcome = Err(self.transport_error(format!("failed to reap process: {err}")));
            }
            debug!(server = %self.server.name, reason, "MCP server process stopped");
        }

        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(self.unavailable(reason.to_string())));
        }
        outcome
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn unavailable(&self, reason: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::ServerUnavailable {
            server: self.server.name.clone(),
            reason: reason.into(),
        }
    }

    fn execution_error(&self, tool: &str, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Execution {
            server: self.server.name.clone(),
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.server.name.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn parse_tool_info(tool: &Value) -> ServerToolInfo {
    ServerToolInfo {
        name: tool.get("name").and_then(Value::as_str).map(str::to_string),
        description: tool
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        input_schema: tool.get("inputSchema").cloned(),
    }
}

/// First non-empty text block of a `tools/call` result.
fn extract_text(result: &Value) -> Option<String> {
    result
        .get("content")
        .and_then(Value::as_array)?
        .iter()
        .filter(|block| {
            block
                .get("type")
                .and_then(Value::as_str)
                .map(|kind| kind.eq_ignore_ascii_case("text"))
                .unwrap_or(true)
        })
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}
