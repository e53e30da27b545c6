// ABOUTME: HTTP transport serving MCP JSON-RPC, the SSE subscription stream, and status routes
// ABOUTME: axum router over the shared McpServer with graceful shutdown that closes subscribers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fodi::types::DriveError;
use futures::stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::subscribe::handle_subscribe;
use crate::events::{FileChangeEvent, ServerEvent};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::transport::McpTransport;

/// MCP transport over HTTP using axum
///
/// Besides `POST /mcp`, serves the SSE subscription stream and the small
/// operational routes listed in [`router`].
pub struct HttpTransport {
    host: String,
    port: u16,
}

impl HttpTransport {
    /// Create an HTTP transport bound to the given host and port
    pub const fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<(), DriveError> {
        let events = Arc::clone(&server.state().events);
        let app = router(server);

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| DriveError::config(format!("Failed to bind {addr}: {e}")))?;

        info!(address = %addr, "HTTP transport listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for shutdown signal");
                    return;
                }
                let closed = events.close_all().await;
                info!(closed, "Shutdown requested, closed subscription streams");
            })
            .await
            .map_err(|e| DriveError::internal(format!("HTTP server error: {e}")))
    }
}

/// Build the application router
///
/// | route | purpose |
/// |---|---|
/// | `POST /mcp` | JSON-RPC (JSON, or one SSE event when the client accepts it) |
/// | `GET /sse` | file change subscription stream |
/// | `GET /status` | connected client count |
/// | `POST /notify` | broadcast a file change to all subscribers |
/// | `GET /oauth/callback` | OAuth authorization-code redirect target |
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post))
        .route("/sse", get(handle_subscribe))
        .route("/status", get(handle_status))
        .route("/notify", post(handle_notify))
        .route("/oauth/callback", get(handle_oauth_callback))
        .with_state(server)
}

/// Handle an incoming MCP POST request
///
/// Parses the body as JSON-RPC, dispatches to the MCP server, and returns
/// the response as JSON or SSE depending on the Accept header.
async fn handle_mcp_post(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse HTTP JSON-RPC body");
            let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
            return Json(resp).into_response();
        }
    };

    debug!(method = %request.method, "Handling HTTP MCP request");

    let Some(response) = server.handle_request(request).await else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let wants_sse = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"));

    if wants_sse {
        respond_sse(&response)
    } else {
        Json(response).into_response()
    }
}

/// Wrap a JSON-RPC response in a single SSE event
fn respond_sse(response: &JsonRpcResponse) -> Response {
    let data = serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"jsonrpc":"2.0","error":{{"code":-32603,"message":"Serialization failed: {e}"}}}}"#
        )
    });

    let event = Event::default().data(data);
    let event_stream = stream::once(async { Ok::<_, Infallible>(event) });

    Sse::new(event_stream).into_response()
}

/// Body of `GET /status`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    /// Registered subscribers at the time of the call
    pub connected_clients: usize,
    /// `"active"` with at least one subscriber, otherwise `"idle"`
    pub status: String,
}

impl StatusResponse {
    /// Status for the given subscriber count
    pub fn from_count(connected_clients: usize) -> Self {
        let status = if connected_clients > 0 { "active" } else { "idle" };
        Self {
            connected_clients,
            status: status.to_owned(),
        }
    }
}

async fn handle_status(State(server): State<Arc<McpServer>>) -> Json<StatusResponse> {
    let count = server.state().events.client_count().await;
    Json(StatusResponse::from_count(count))
}

/// Fan a file change out to every subscriber
async fn handle_notify(
    State(server): State<Arc<McpServer>>,
    Json(change): Json<FileChangeEvent>,
) -> Json<serde_json::Value> {
    let events = &server.state().events;
    debug!(kind = ?change.kind, path = %change.file.path, "Broadcasting file change");

    let delivered = events.broadcast(&ServerEvent::FileChange(change)).await;
    let connected_clients = events.client_count().await;

    Json(json!({
        "delivered": delivered,
        "connected_clients": connected_clients,
    }))
}

/// Query string of the OAuth redirect
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn handle_oauth_callback(
    State(server): State<Arc<McpServer>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        let reason = query
            .error_description
            .or(query.error)
            .unwrap_or_else(|| "Missing authorization code".to_owned());
        warn!(reason = %reason, "OAuth callback without a code");
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response();
    };

    match server.state().auth.exchange_code(&code).await {
        Ok(tokens) => {
            info!("OAuth authorization code exchanged");
            Json(tokens).into_response()
        }
        Err(e) => {
            let e = e.with_context("Failed to exchange authorization code");
            warn!(error = %e, "OAuth callback failed");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.message }))).into_response()
        }
    }
}
