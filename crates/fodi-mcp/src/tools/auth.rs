// ABOUTME: get_auth_url tool returning the OAuth authorization URL for the drive
// ABOUTME: The callback route completes the flow; this tool only hands out the link
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use fodi::types::DriveError;
use serde_json::{json, Value};

use super::{NoArgs, TypedTool};
use crate::state::ServerState;

const INSTRUCTIONS: &str = "Open the URL in a browser and sign in. After consent the browser is \
     redirected to the server's /oauth/callback route, which exchanges the code for tokens.";

/// `get_auth_url` tool
pub struct GetAuthUrl;

#[async_trait]
impl TypedTool for GetAuthUrl {
    const NAME: &'static str = "get_auth_url";
    type Args = NoArgs;

    fn description(&self) -> &'static str {
        "Get the OAuth URL a user opens to authorize access to their drive"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, state: &ServerState, _args: NoArgs) -> Result<Value, DriveError> {
        Ok(json!({
            "auth_url": state.auth.authorization_url(),
            "instructions": INSTRUCTIONS,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use fodi::MemoryStore;

    #[tokio::test]
    async fn returns_configured_authorization_url() {
        let state = test_state(MemoryStore::new());
        let out = GetAuthUrl.run(&state, NoArgs {}).await.expect("auth url");

        let url = out["auth_url"].as_str().expect("string");
        assert!(url.contains("/oauth2/v2.0/authorize?"));
        assert!(url.contains("client_id=test-client"));
        assert!(out["instructions"]
            .as_str()
            .is_some_and(|s| s.contains("/oauth/callback")));
    }
}
