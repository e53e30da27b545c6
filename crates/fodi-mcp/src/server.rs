// ABOUTME: MCP server core that routes JSON-RPC requests to protocol handlers and tools
// ABOUTME: Implements initialize, tools/list, tools/call, and ping MCP methods
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use serde_json::Value;
use tracing::debug;

use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ToolsListResult, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
};
use crate::state::SharedState;
use crate::tools::ToolRegistry;

/// MCP server that dispatches JSON-RPC requests to the appropriate handler
///
/// Owns the shared state and tool registry. Transport layers feed parsed
/// requests into `handle_request` and send the returned responses.
pub struct McpServer {
    state: SharedState,
    tools: ToolRegistry,
}

impl McpServer {
    /// Create a server with the given shared state and tool registry
    pub const fn new(state: SharedState, tools: ToolRegistry) -> Self {
        Self { state, tools }
    }

    /// Shared state, used by the HTTP routes that bypass JSON-RPC
    pub const fn state(&self) -> &SharedState {
        &self.state
    }

    /// Route a JSON-RPC request to the appropriate MCP handler
    ///
    /// Returns `None` for notifications (requests without an id).
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        // Notifications have no id and expect no response
        if request.id.is_none() {
            debug!(method = %request.method, "Received notification, no response");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id, request.params),
            "tools/list" => JsonRpcResponse::from_serializable(
                request.id,
                &ToolsListResult {
                    tools: self.tools.list_definitions(),
                },
            ),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "ping" => JsonRpcResponse::success(request.id, Value::Object(serde_json::Map::new())),
            method => {
                debug!(method, "Unknown MCP method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                )
            }
        };

        Some(response)
    }

    /// Handle `initialize`: log client info and return server capabilities
    fn handle_initialize(id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        if let Some(init) = params.and_then(|p| serde_json::from_value::<InitializeParams>(p).ok())
        {
            debug!(
                client = %init.client_info.name,
                version = ?init.client_info.version,
                protocol = %init.protocol_version,
                "MCP client initialized"
            );
        }

        JsonRpcResponse::from_serializable(id, &InitializeResult::current())
    }

    /// Handle `tools/call`: dispatch to the named tool
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "Missing params for tools/call".to_owned(),
            );
        };
        let call: CallToolParams = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}"));
            }
        };

        let result = self
            .tools
            .call(&call.name, &self.state, call.arguments)
            .await;

        JsonRpcResponse::from_serializable(id, &result)
    }
}
