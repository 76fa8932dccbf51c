//! MCP JSON-RPC protocol handler over stdio.
//!
//! Reads JSON-RPC requests from stdin, routes them to the tool registry or the
//! prompt surface, and sends JSON-RPC responses to stdout. Implements the MCP
//! protocol methods: `initialize`, `ping`, `tools/list`, `tools/call`,
//! `prompts/list`, `prompts/get`.
//!
//! Every request runs in its own task. Responses go through a channel to a
//! single writer task so lines never interleave.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::McpError;
use super::prompts::{self, GetPromptRequest};
use super::tools::{HandlerContext, SharedToolRegistry, ToolRequest};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "obsidian-mcp-tools";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// JSON-RPC message types
// ---------------------------------------------------------------------------

/// Incoming JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// Outgoing JSON-RPC response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    fn from_mcp_error(id: Value, err: McpError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: err.code.as_i64(),
                message: err.message,
                data: err.data,
            }),
        }
    }

    fn from_result<T: Serialize>(id: Value, result: Result<T, McpError>) -> Self {
        match result.and_then(|value| {
            serde_json::to_value(value)
                .map_err(|e| McpError::internal(format!("Failed to serialize result: {}", e)))
        }) {
            Ok(value) => Self::success(id, value),
            Err(err) => Self::from_mcp_error(id, err),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

/// Shared server state.
pub struct McpServerState {
    registry: SharedToolRegistry,
    context: HandlerContext,
}

impl McpServerState {
    pub fn new(registry: SharedToolRegistry, context: HandlerContext) -> Self {
        Self { registry, context }
    }
}

/// Run the MCP server on stdin/stdout until stdin closes.
///
/// Diagnostic logs go to stderr (and the log file), never stdout.
pub async fn run_server(state: McpServerState) -> std::io::Result<()> {
    info!("{} MCP server v{} running on stdio", SERVER_NAME, env!("CARGO_PKG_VERSION"));
    serve(tokio::io::stdin(), tokio::io::stdout(), Arc::new(state)).await?;
    info!("MCP server stdin closed, shutting down");
    Ok(())
}

/// Serve line-delimited JSON-RPC from `reader` to `writer`.
///
/// Returns once the reader hits EOF and every in-flight request has written
/// its response.
pub async fn serve<R, W>(reader: R, writer: W, state: Arc<McpServerState>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
    let writer_task = tokio::spawn(write_responses(writer, rx));

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request = match parse_request(line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(response) => {
                let _ = tx.send(response);
                continue;
            }
        };

        let state = state.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = handle_request(&state, request).await {
                let _ = tx.send(response);
            }
        });
    }

    drop(tx);
    if let Err(e) = writer_task.await {
        error!("[MCP] Writer task failed: {}", e);
    }
    Ok(())
}

/// Parse one line. `Ok(None)` means the line is dropped without a reply.
fn parse_request(line: &str) -> Result<Option<JsonRpcRequest>, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)))?;
    let id = value.get("id").cloned();

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return match id {
                Some(id) => Err(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                )),
                None => {
                    warn!("[MCP] Ignoring malformed message: {}", e);
                    Ok(None)
                }
            };
        }
    };

    if request.jsonrpc != "2.0" {
        return match request.id {
            Some(id) => Err(JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid JSON-RPC version")),
            None => Ok(None),
        };
    }
    Ok(Some(request))
}

/// Handle a single JSON-RPC request. Notifications produce no response.
async fn handle_request(state: &McpServerState, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let Some(id) = request.id else {
        handle_notification(&request.method, &request.params);
        return None;
    };

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(id),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": state.registry.list() })),
        "tools/call" => handle_tools_call(state, id, request.params).await,
        "prompts/list" => {
            let result = prompts::list_prompts(state.context.vault())
                .await
                .map(|prompts| json!({ "prompts": prompts }));
            JsonRpcResponse::from_result(id, result)
        }
        "prompts/get" => handle_prompts_get(state, id, request.params).await,
        _ => JsonRpcResponse::error(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    };
    Some(response)
}

fn handle_notification(method: &str, params: &Value) {
    match method {
        "notifications/initialized" | "initialized" => info!("[MCP] Client initialized"),
        "notifications/cancelled" => info!("[MCP] Request cancelled: {}", params),
        other => debug!("[MCP] Ignoring notification {}", other),
    }
}

/// Handle `initialize` -- return server capabilities.
fn handle_initialize(id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "prompts": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

/// Handle `tools/call` -- dispatch through the registry.
async fn handle_tools_call(state: &McpServerState, id: Value, params: Value) -> JsonRpcResponse {
    let request: ToolRequest = match serde_json::from_value(params) {
        Ok(request) => request,
        Err(e) => {
            return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid tools/call params: {}", e));
        }
    };

    let result = state.registry.dispatch(request, state.context.clone()).await;
    JsonRpcResponse::from_result(id, result)
}

/// Handle `prompts/get` -- render one prompt template.
async fn handle_prompts_get(state: &McpServerState, id: Value, params: Value) -> JsonRpcResponse {
    let request: GetPromptRequest = match serde_json::from_value(params) {
        Ok(request) => request,
        Err(e) => {
            return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid prompts/get params: {}", e));
        }
    };

    let result = prompts::get_prompt(state.context.vault(), request).await;
    JsonRpcResponse::from_result(id, result)
}

/// Drain the response channel onto `writer`, one JSON document per line.
async fn write_responses<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>) {
    while let Some(response) = rx.recv().await {
        let json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                error!("[MCP] Failed to serialize response: {}", e);
                let fallback = JsonRpcResponse::error(response.id, INTERNAL_ERROR, "Failed to serialize response");
                match serde_json::to_string(&fallback) {
                    Ok(json) => json,
                    Err(_) => continue,
                }
            }
        };

        let line = format!("{}\n", json);
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("[MCP] Failed to write response: {}", e);
            continue;
        }
        if let Err(e) = writer.flush().await {
            error!("[MCP] Failed to flush stdout: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::mcp::contract::{ArgumentShape, Field, FieldKind, ToolContract};
    use crate::mcp::handlers::McpToolResult;
    use crate::mcp::tools::ToolRegistry;
    use crate::vault::testing::{serve as serve_vault, Canned};
    use crate::vault::VaultClient;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, DuplexStream};

    async fn echo(request: ToolRequest, _ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
        Ok(McpToolResult::text(request.arguments["text"].as_str().unwrap_or_default().to_string()))
    }

    fn state_with(config: &ServerConfig) -> Arc<McpServerState> {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolContract::new("echo", "Echo text back")
                    .with_arguments(ArgumentShape::new().with(Field::required("text", FieldKind::string()))),
                echo,
            )
            .unwrap();
        let context = HandlerContext::new(VaultClient::new(config).unwrap(), reqwest::Client::new());
        Arc::new(McpServerState::new(SharedToolRegistry::new(registry), context))
    }

    /// Feed `input` to a server and collect every response line.
    async fn exchange(state: Arc<McpServerState>, input: &str) -> Vec<Value> {
        let (mut client, server): (DuplexStream, DuplexStream) = tokio::io::duplex(64 * 1024);
        let (read_half, write_half) = tokio::io::split(server);
        let task = tokio::spawn(serve(read_half, write_half, state));

        client.write_all(input.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();
        task.await.unwrap().unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn by_id(responses: Vec<Value>) -> HashMap<String, Value> {
        responses
            .into_iter()
            .map(|r| (r["id"].to_string(), r))
            .collect()
    }

    #[test]
    fn test_json_rpc_response_success() {
        let resp = JsonRpcResponse::success(json!(1), json!({"result": "ok"}));
        let serialized = serde_json::to_string(&resp).unwrap();
        assert!(serialized.contains("\"result\""));
        assert!(!serialized.contains("\"error\""));
    }

    #[test]
    fn test_mcp_error_keeps_data() {
        let err = McpError::internal("boom").with_data(json!({ "raw": 1 }));
        let resp = JsonRpcResponse::from_mcp_error(json!(7), err);
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            wire,
            json!({ "jsonrpc": "2.0", "id": 7, "error": { "code": -32603, "message": "boom", "data": { "raw": 1 } } })
        );
    }

    #[test]
    fn test_handle_initialize() {
        let resp = handle_initialize(json!(1));
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "obsidian-mcp-tools");
        assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
    }

    #[test]
    fn test_parse_json_rpc_request() {
        let json = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}"#;
        let req = parse_request(json).unwrap().unwrap();
        assert_eq!(req.method, "tools/list");
        assert_eq!(req.id, Some(json!(1)));
    }

    #[test]
    fn test_parse_errors() {
        let resp = parse_request("{not json").unwrap_err();
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
        assert_eq!(resp.id, Value::Null);

        let resp = parse_request(r#"{"jsonrpc":"1.0","id":3,"method":"ping"}"#).unwrap_err();
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);

        let resp = parse_request(r#"{"jsonrpc":"2.0","id":4}"#).unwrap_err();
        assert_eq!(resp.id, json!(4));
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);

        assert!(parse_request(r#"{"jsonrpc":"1.0","method":"ping"}"#).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_over_duplex() {
        let state = state_with(&ServerConfig::new("k"));
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"echo","arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"missing"}}"#,
            r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#,
            r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#,
            "",
            "garbage",
        ]
        .join("\n");

        let responses = exchange(state, &input).await;
        assert_eq!(responses.len(), 8);
        let responses = by_id(responses);

        assert_eq!(responses["1"]["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(responses["2"]["result"]["tools"][0]["name"], "echo");
        assert_eq!(
            responses["3"]["result"],
            json!({ "content": [{ "type": "text", "text": "hi" }], "isError": false })
        );
        assert_eq!(responses["4"]["error"]["code"], -32602);
        assert_eq!(responses["4"]["error"]["message"], "text must be a string (was missing)");
        assert_eq!(responses["5"]["error"]["code"], -32600);
        assert_eq!(responses["5"]["error"]["message"], "Unknown tool: missing");
        assert_eq!(responses["6"]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses["7"]["result"], json!({}));
        assert_eq!(responses["null"]["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_tools_call_requires_name() {
        let state = state_with(&ServerConfig::new("k"));
        let responses = exchange(
            state,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"arguments":{}}}"#,
        )
        .await;
        assert_eq!(responses[0]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_prompts_list_over_duplex() {
        let (config, _rx) = serve_vault(|req| {
            if req.path == "/vault/Prompts/" {
                Canned::json(200, json!({ "files": [] }))
            } else {
                Canned::text(404, "text/plain", "missing")
            }
        })
        .await;
        let state = state_with(&config);

        let responses = exchange(
            state,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"prompts/list\"}\n\
             {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"prompts/get\",\"params\":{\"name\":\"gone.md\"}}\n",
        )
        .await;
        let responses = by_id(responses);
        assert_eq!(responses["1"]["result"], json!({ "prompts": [] }));
        assert_eq!(responses["2"]["error"]["code"], -32603);
        assert!(responses["2"]["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("GET /vault/Prompts/gone.md 404"));
    }
}
