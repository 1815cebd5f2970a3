pub mod auth;
pub mod config;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod gatekeeper;
pub mod google;
pub mod normalize;
pub mod tools;
pub mod upstream;

use std::sync::Arc;

use gdocs_core::error::rpc;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use dispatch::Dispatcher;
use error::GatewayError;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "gdocs-mcp";

pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve MCP over the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(self: Arc<Self>) -> Result<(), String> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }

    /// Each request runs on its own task; responses are written in
    /// completion order by a single writer, framed like their request.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Value, Framing)>();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some((response, framing)) = rx.recv().await {
                write_message(&mut writer, &response, framing).await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut in_flight = JoinSet::new();
        loop {
            let inbound = read_message(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            match inbound {
                None => break,
                Some(Inbound::Malformed { reason, framing }) => {
                    tracing::warn!(event = "mcp_parse_error", error = %reason);
                    let response = error_response(
                        Value::Null,
                        RpcError::parse_error(format!("Parse error: {reason}")),
                    );
                    let _ = tx.send((response, framing));
                }
                Some(Inbound::Message { value, framing }) => {
                    let server = self.clone();
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        for response in server.handle_incoming_message(value).await {
                            let _ = tx.send((response, framing));
                        }
                    });
                }
            }
            while let Some(finished) = in_flight.try_join_next() {
                if let Err(err) = finished {
                    tracing::error!(event = "mcp_request_task_failed", error = %err);
                }
            }
        }

        while let Some(finished) = in_flight.join_next().await {
            if let Err(err) = finished {
                tracing::error!(event = "mcp_request_task_failed", error = %err);
            }
        }
        drop(tx);
        writer_task
            .await
            .map_err(|e| format!("MCP writer task failed: {e}"))?
            .map_err(|e| format!("Failed to write MCP response: {e}"))
    }

    /// Handle one decoded JSON-RPC payload (single message or batch).
    /// Returns the responses to send; notifications produce none.
    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A client response; the server never issues requests of its own.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            tracing::debug!(event = "mcp_notification", method);
            None
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        let names: Vec<&str> = self
            .dispatcher
            .list_tool_descriptors()
            .iter()
            .map(|tool| tool.name)
            .collect();
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "resources": {
                    "listChanged": false
                },
                "prompts": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": format!(
                "Google Docs tools: {}. Use list-docs to find document IDs, get-doc with formattingArgs.includePreview for a bounded preview, and update-doc with writeControl.requiredRevisionId to avoid overwriting concurrent edits.",
                names.join(", ")
            )
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = self
            .dispatcher
            .list_tool_descriptors()
            .iter()
            .map(|tool| tool.to_listing())
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let result = self.dispatcher.dispatch(name, &args).await?;
        Ok(result.to_value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: rpc::PARSE_ERROR,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: rpc::INVALID_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: rpc::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: rpc::INVALID_PARAMS,
            message: message.into(),
            data: None,
        }
    }
}

impl From<GatewayError> for RpcError {
    fn from(err: GatewayError) -> Self {
        Self {
            code: err.rpc_code(),
            message: err.to_string(),
            data: Some(err.rpc_data()),
        }
    }
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

/// Wire encoding of one stdio message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// LSP-style `Content-Length` headers, blank line, body.
    ContentLength,
    /// One JSON document per line.
    Newline,
}

#[derive(Debug, PartialEq)]
enum Inbound {
    Message { value: Value, framing: Framing },
    Malformed { reason: String, framing: Framing },
}

/// Read the next message, detecting its framing from the first non-blank line.
/// `Ok(None)` on clean EOF.
async fn read_message<R>(reader: &mut R) -> Result<Option<Inbound>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !in_headers {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let trimmed = line.trim();
        if !in_headers {
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                let framing = Framing::Newline;
                return Ok(Some(match serde_json::from_str(trimmed) {
                    Ok(value) => Inbound::Message { value, framing },
                    Err(e) => Inbound::Malformed {
                        reason: e.to_string(),
                        framing,
                    },
                }));
            }
            in_headers = true;
        } else if trimmed.is_empty() {
            break;
        }

        if let Some((name, raw_len)) = trimmed.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let parsed = raw_len.trim().parse::<usize>().map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "Invalid Content-Length header",
                    )
                })?;
                content_length = Some(parsed);
            }
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    let framing = Framing::ContentLength;
    Ok(Some(match serde_json::from_slice(&payload) {
        Ok(value) => Inbound::Message { value, framing },
        Err(e) => Inbound::Malformed {
            reason: e.to_string(),
            framing,
        },
    }))
}

async fn write_message<W>(writer: &mut W, value: &Value, framing: Framing) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::Newline => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
