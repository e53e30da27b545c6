// ABOUTME: get_fodi_info tool describing the server, its tools, store, and live subscribers
// ABOUTME: Read-only snapshot assembled from the catalog constants and shared state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use fodi::types::{DriveError, StoreCapabilities};
use serde_json::{json, Value};

use super::{NoArgs, TypedTool, STANDARD_TOOLS};
use crate::protocol::{SERVER_NAME, SERVER_VERSION};
use crate::state::ServerState;

const DESCRIPTION: &str =
    "FODI exposes a cloud drive to MCP clients and pushes file change notifications over SSE";

/// `get_fodi_info` tool
pub struct GetFodiInfo;

#[async_trait]
impl TypedTool for GetFodiInfo {
    const NAME: &'static str = "get_fodi_info";
    type Args = NoArgs;

    fn description(&self) -> &'static str {
        "Get information about this FODI server, its tools, and connected subscribers"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, state: &ServerState, _args: NoArgs) -> Result<Value, DriveError> {
        let caps = state.store.capabilities();
        Ok(json!({
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": DESCRIPTION,
            "tools": STANDARD_TOOLS,
            "store": {
                "name": state.store.name(),
                "native_search": caps.contains(StoreCapabilities::NATIVE_SEARCH),
                "download_url": caps.contains(StoreCapabilities::DOWNLOAD_URL),
                "modified_time": caps.contains(StoreCapabilities::MODIFIED_TIME),
            },
            "connected_clients": state.events.client_count().await,
            "endpoints": {
                "mcp": "POST /mcp",
                "sse": "GET /sse",
                "status": "GET /status",
                "notify": "POST /notify",
                "oauth_callback": "GET /oauth/callback",
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use fodi::MemoryStore;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn reports_tools_store_and_clients() {
        let state = test_state(MemoryStore::new());
        let (tx, _rx) = mpsc::channel(4);
        state.events.add_client("c1".to_owned(), tx).await;

        let out = GetFodiInfo.run(&state, NoArgs {}).await.expect("info");
        assert_eq!(out["name"], "fodi-mcp");
        assert_eq!(out["tools"].as_array().map(Vec::len), Some(6));
        assert_eq!(out["store"]["name"], "memory");
        assert_eq!(out["store"]["native_search"], false);
        assert_eq!(out["connected_clients"], 1);
        assert_eq!(out["endpoints"]["sse"], "GET /sse");
    }
}
