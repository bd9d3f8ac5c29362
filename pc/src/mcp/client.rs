//! MCP client over stdio
//!
//! Spawns a tool server as a child process and speaks line-delimited
//! JSON-RPC 2.0 with it. Three background tasks own the pipes: a writer fed by
//! a channel, a stdout reader that routes responses to waiting requests by id,
//! and a stderr reader that forwards server logs to tracing.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::llm::ToolDefinition;
use crate::tools::{ToolError, ToolInvoker, ToolResult};

/// MCP protocol revision announced during the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Waiting requests by id; `None` once the reader has stopped
type PendingMap = Arc<Mutex<Option<HashMap<String, oneshot::Sender<Value>>>>>;

/// Connection to one MCP server process
pub struct McpClient {
    server: String,
    child: Mutex<Option<Child>>,
    pending: PendingMap,
    tx: mpsc::Sender<String>,
    request_timeout: Duration,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("server", &self.server)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl McpClient {
    /// Spawn the server process and complete the MCP handshake
    pub async fn connect(server: &str, config: &ServerConfig) -> Result<Self, ToolError> {
        debug!(%server, command = %config.command, "McpClient::connect: called");
        let client = Self::spawn(server, config, DEFAULT_REQUEST_TIMEOUT)?;
        client.initialize().await?;
        info!("Connected to tool server {}", server);
        Ok(client)
    }

    fn spawn(server: &str, config: &ServerConfig, request_timeout: Duration) -> Result<Self, ToolError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(ToolError::Disconnected)?;
        let stdout = child.stdout.take().ok_or(ToolError::Disconnected)?;
        let stderr = child.stderr.take().ok_or(ToolError::Disconnected)?;

        let (tx, rx) = mpsc::channel::<String>(64);
        let pending: PendingMap = Arc::new(Mutex::new(Some(HashMap::new())));

        tokio::spawn(write_loop(stdin, rx));
        tokio::spawn(read_loop(server.to_string(), stdout, Arc::clone(&pending)));
        tokio::spawn(stderr_loop(server.to_string(), stderr));

        Ok(Self {
            server: server.to_string(),
            child: Mutex::new(Some(child)),
            pending,
            tx,
            request_timeout,
        })
    }

    /// Server name this client was connected under
    pub fn server(&self) -> &str {
        &self.server
    }

    async fn initialize(&self) -> Result<(), ToolError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;
        debug!(server = %self.server, server_info = %result["serverInfo"], "McpClient::initialize: handshake complete");

        self.notify("notifications/initialized", json!({})).await
    }

    /// Send a request and wait for its result
    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        let id = Uuid::now_v7().to_string();
        debug!(server = %self.server, %method, %id, "McpClient::request: called");

        let (resp_tx, resp_rx) = oneshot::channel();
        match self.pending.lock().await.as_mut() {
            Some(waiting) => {
                waiting.insert(id.clone(), resp_tx);
            }
            None => {
                debug!(server = %self.server, %method, "McpClient::request: reader already stopped");
                return Err(ToolError::Disconnected);
            }
        }

        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if self.tx.send(serde_json::to_string(&message)?).await.is_err() {
            self.forget(&id).await;
            return Err(ToolError::Disconnected);
        }

        let response = match tokio::time::timeout(self.request_timeout, resp_rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ToolError::Disconnected),
            Err(_) => {
                self.forget(&id).await;
                return Err(ToolError::Timeout {
                    method: method.to_string(),
                    timeout: self.request_timeout,
                });
            }
        };

        parse_rpc_response(response)
    }

    async fn forget(&self, id: &str) {
        if let Some(waiting) = self.pending.lock().await.as_mut() {
            waiting.remove(id);
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), ToolError> {
        let message = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.tx
            .send(serde_json::to_string(&message)?)
            .await
            .map_err(|_| ToolError::Disconnected)
    }
}

#[async_trait]
impl ToolInvoker for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;

            let page: Vec<ToolDefinition> = serde_json::from_value(result["tools"].clone())?;
            tools.extend(page);

            cursor = result["nextCursor"].as_str().map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        debug!(server = %self.server, count = tools.len(), "McpClient::list_tools: done");
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolError> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(tool_result_from(&result))
    }

    async fn shutdown(&self) -> Result<(), ToolError> {
        debug!(server = %self.server, "McpClient::shutdown: called");
        if let Some(mut child) = self.child.lock().await.take() {
            child.kill().await?;
            info!("Disconnected from tool server {}", self.server);
        }
        Ok(())
    }
}

/// Extract `result` from a JSON-RPC response, or its error
fn parse_rpc_response(response: Value) -> Result<Value, ToolError> {
    if let Some(error) = response.get("error") {
        return Err(ToolError::Rpc {
            code: error["code"].as_i64().unwrap_or(0),
            message: error["message"].as_str().unwrap_or("Unknown error").to_string(),
        });
    }

    match response.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(ToolError::InvalidResponse(format!("missing result: {}", response))),
    }
}

/// Flatten a `tools/call` result into text
fn tool_result_from(result: &Value) -> ToolResult {
    let text = result["content"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| match item["text"].as_str() {
                    Some(t) => t.to_string(),
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if result["isError"].as_bool().unwrap_or(false) {
        ToolResult::error(text)
    } else {
        ToolResult::success(text)
    }
}

async fn write_loop(mut stdin: tokio::process::ChildStdin, mut rx: mpsc::Receiver<String>) {
    while let Some(msg) = rx.recv().await {
        let written = async {
            stdin.write_all(msg.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!("Failed to write to tool server stdin: {}", e);
            break;
        }
    }
}

async fn read_loop(server: String, stdout: tokio::process::ChildStdout, pending: PendingMap) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Ok(value) = serde_json::from_str::<Value>(&line) else {
                    debug!(%server, %line, "read_loop: skipping non-JSON line");
                    continue;
                };
                let id = match value.get("id") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => continue, // server notification
                };
                let sender = pending.lock().await.as_mut().and_then(|waiting| waiting.remove(&id));
                if let Some(sender) = sender {
                    let _ = sender.send(value);
                }
            }
            Ok(None) => {
                debug!(%server, "read_loop: stdout closed");
                break;
            }
            Err(e) => {
                warn!("Error reading from tool server {}: {}", server, e);
                break;
            }
        }
    }

    // Dropping the senders wakes every waiter with Disconnected
    *pending.lock().await = None;
}

async fn stderr_loop(server: String, stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(%server, "server stderr: {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rpc_response_result() {
        let result = parse_rpc_response(json!({ "jsonrpc": "2.0", "id": "1", "result": { "ok": true } })).unwrap();
        assert_eq!(result["ok"], true);
    }

    #[test]
    fn test_parse_rpc_response_error() {
        let err = parse_rpc_response(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": { "code": -32602, "message": "Invalid params" }
        }))
        .unwrap_err();

        match err {
            ToolError::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "Invalid params");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_rpc_response_missing_result() {
        assert!(matches!(
            parse_rpc_response(json!({ "jsonrpc": "2.0", "id": "1" })),
            Err(ToolError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_tool_result_from_text_content() {
        let result = tool_result_from(&json!({
            "content": [
                { "type": "text", "text": "Allowed directories:" },
                { "type": "text", "text": "/tmp" }
            ]
        }));

        assert!(!result.is_error);
        assert_eq!(result.content, "Allowed directories:\n/tmp");
    }

    #[test]
    fn test_tool_result_from_error() {
        let result = tool_result_from(&json!({
            "content": [{ "type": "text", "text": "ENOENT" }],
            "isError": true
        }));

        assert!(result.is_error);
        assert_eq!(result.content, "ENOENT");
    }

    #[tokio::test]
    async fn test_connect_to_missing_binary_fails() {
        let config = ServerConfig {
            command: "promptcal-definitely-not-a-real-binary".to_string(),
            ..Default::default()
        };

        let err = McpClient::connect("ghost", &config).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_request_fails_when_server_exits() {
        let config = ServerConfig {
            command: "true".to_string(),
            ..Default::default()
        };

        let client = McpClient::spawn("short-lived", &config, Duration::from_secs(5)).unwrap();
        let err = client.request("tools/list", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Disconnected));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_request_after_reader_stopped_fails_fast() {
        let config = ServerConfig {
            command: "true".to_string(),
            ..Default::default()
        };
        let client = McpClient::spawn("exited", &config, Duration::from_secs(30)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while client.pending.lock().await.is_some() {
            assert!(std::time::Instant::now() < deadline, "reader never stopped");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let start = std::time::Instant::now();
        let err = client.request("tools/list", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Disconnected));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
