//! MCP over HTTP: `POST /mcp` takes one JSON-RPC message or batch.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gdocs_mcp_runtime::{McpServer, RpcError, error_response};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

const MCP_PATH: &str = "/mcp";

pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route(MCP_PATH, post(mcp_post))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

pub async fn serve(server: Arc<McpServer>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(event = "http_listening", addr = %listener.local_addr()?, path = MCP_PATH);
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(event = "shutdown_signal_failed", error = %err);
        return;
    }
    tracing::info!(event = "shutdown_requested");
}

async fn mcp_post(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    let incoming: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(error_response(Value::Null, RpcError::parse_error("Parse error"))),
            )
                .into_response();
        }
    };

    let mut responses = server.handle_incoming_message(incoming).await;

    if responses.is_empty() {
        return StatusCode::ACCEPTED.into_response();
    }

    if responses.len() == 1 {
        return (StatusCode::OK, Json(responses.remove(0))).into_response();
    }

    (StatusCode::OK, Json(Value::Array(responses))).into_response()
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
