// ABOUTME: Tool catalog and dispatcher mapping MCP tool names to typed handlers
// ABOUTME: Validates arguments into per-tool structs and folds outcomes into the result envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod auth;
pub mod files;
pub mod info;

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use fodi::types::DriveError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::protocol::{CallToolResult, ToolDefinition};
use crate::state::ServerState;

/// Names of the standard tools, in advertised order
pub const STANDARD_TOOLS: [&str; 6] = [
    files::ListFiles::NAME,
    files::SearchFiles::NAME,
    files::GetFileInfo::NAME,
    files::GetDownloadUrl::NAME,
    auth::GetAuthUrl::NAME,
    info::GetFodiInfo::NAME,
];

/// Object-safe tool interface used by the registry
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Return the tool's MCP descriptor (name, description, input schema)
    fn definition(&self) -> ToolDefinition;

    /// Validate the raw arguments and run the tool
    async fn call(&self, state: &ServerState, arguments: Map<String, Value>) -> CallToolResult;
}

/// A tool with a statically typed argument struct
///
/// Arguments are deserialized into [`TypedTool::Args`] before `run` is
/// reached, so handlers never see malformed input. Every typed tool is an
/// [`McpTool`] through the blanket impl below.
#[async_trait]
pub trait TypedTool: Send + Sync {
    /// Unique tool name
    const NAME: &'static str;

    /// Argument struct for this tool
    type Args: DeserializeOwned + Send;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments
    fn input_schema(&self) -> Value;

    /// Execute with validated arguments, returning the JSON result value
    async fn run(&self, state: &ServerState, args: Self::Args) -> Result<Value, DriveError>;
}

#[async_trait]
impl<T: TypedTool> McpTool for T {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: T::NAME.to_owned(),
            description: self.description().to_owned(),
            input_schema: self.input_schema(),
        }
    }

    async fn call(&self, state: &ServerState, arguments: Map<String, Value>) -> CallToolResult {
        let args = match serde_json::from_value::<T::Args>(Value::Object(arguments)) {
            Ok(args) => args,
            Err(e) => {
                debug!(tool = T::NAME, error = %e, "Rejected tool arguments");
                return CallToolResult::error(&format!("Invalid arguments for {}: {e}", T::NAME));
            }
        };
        CallToolResult::from_outcome(self.run(state, args).await)
    }
}

/// Arguments of tools that take none (extra fields are ignored)
#[derive(Debug, Default, serde::Deserialize)]
pub struct NoArgs {}

/// Ordered catalog of tools with name lookup for dispatch
///
/// The listing order is registration order; names are unique.
pub struct ToolRegistry {
    tools: Vec<Box<dyn McpTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool; a second tool with the same name is rejected
    pub fn register(&mut self, tool: Box<dyn McpTool>) -> Result<(), DriveError> {
        let name = tool.definition().name;
        if self.index.contains_key(&name) {
            return Err(DriveError::config(format!(
                "Tool registered twice: {name}"
            )));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Tool descriptors in catalog order, for `tools/list`
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Tool names in catalog order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` when no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a `tools/call` to the named tool
    ///
    /// Never fails at the transport level: unknown tools, invalid arguments,
    /// and handler errors all come back as error content. The name is
    /// resolved before the arguments are looked at. Absent or `null`
    /// arguments mean `{}`; any other non-object is rejected.
    pub async fn call(&self, name: &str, state: &ServerState, arguments: Value) -> CallToolResult {
        let Some(tool) = self.index.get(name).and_then(|&i| self.tools.get(i)) else {
            warn!(tool = name, "Unknown tool requested");
            return CallToolResult::error(&format!("Unknown tool: {name}"));
        };

        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                debug!(tool = name, arguments = %other, "Rejected non-object arguments");
                return CallToolResult::error(&format!(
                    "Invalid arguments for {name}: expected an object"
                ));
            }
        };

        let started = Instant::now();
        let result = tool.call(state, arguments).await;
        debug!(
            tool = name,
            is_error = result.is_error(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool call finished"
        );
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry with the six standard FODI tools
///
/// Fails if the registered catalog does not match [`STANDARD_TOOLS`]
/// exactly, so a mismatch stops the server before it accepts traffic.
pub fn build_tool_registry() -> Result<ToolRegistry, DriveError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(files::ListFiles))?;
    registry.register(Box::new(files::SearchFiles))?;
    registry.register(Box::new(files::GetFileInfo))?;
    registry.register(Box::new(files::GetDownloadUrl))?;
    registry.register(Box::new(auth::GetAuthUrl))?;
    registry.register(Box::new(info::GetFodiInfo))?;

    let names = registry.names();
    if names != STANDARD_TOOLS {
        return Err(DriveError::config(format!(
            "Tool catalog mismatch: registered {names:?}, expected {STANDARD_TOOLS:?}"
        )));
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ERROR_PREFIX;
    use crate::state::test_state;
    use fodi::MemoryStore;
    use serde_json::json;

    #[test]
    fn catalog_lists_six_unique_tools_in_order() {
        let registry = build_tool_registry().expect("registry");
        let names = registry.names();
        assert_eq!(names, STANDARD_TOOLS);

        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 6);

        let again: Vec<String> = registry
            .list_definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(again, names);
    }

    #[test]
    fn every_definition_has_object_schema() {
        let registry = build_tool_registry().expect("registry");
        for def in registry.list_definitions() {
            assert_eq!(def.input_schema["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty(), "{}", def.name);
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(files::ListFiles))
            .expect("first");
        assert!(registry.register(Box::new(files::ListFiles)).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_error_content() {
        let registry = build_tool_registry().expect("registry");
        let state = test_state(MemoryStore::new());

        for name in ["delete_everything", "", "LIST_FILES"] {
            let result = registry.call(name, &state, json!({})).await;
            assert!(result.is_error());
            assert_eq!(result.text(), format!("Error: Unknown tool: {name}"));
        }
    }

    #[tokio::test]
    async fn missing_required_argument_is_error_content() {
        let registry = build_tool_registry().expect("registry");
        let state = test_state(MemoryStore::new());

        let result = registry.call("get_file_info", &state, Value::Null).await;
        assert!(result.is_error());
        assert!(result
            .text()
            .starts_with("Error: Invalid arguments for get_file_info:"));
    }

    #[tokio::test]
    async fn wrongly_typed_argument_is_error_content() {
        let registry = build_tool_registry().expect("registry");
        let state = test_state(MemoryStore::new());

        let result = registry
            .call("list_files", &state, json!({"path": 42}))
            .await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn every_outcome_is_json_or_error_prefixed() {
        let registry = build_tool_registry().expect("registry");
        let state = test_state(MemoryStore::demo().await.expect("demo"));

        let calls = [
            ("list_files", json!({})),
            ("list_files", json!({"path": "/missing"})),
            ("search_files", json!({"query": "doc"})),
            ("search_files", json!({})),
            ("get_file_info", json!({"path": "/README.md"})),
            ("get_download_url", json!({"path": "/Documents"})),
            ("get_auth_url", json!({})),
            ("get_fodi_info", json!({"ignored": true})),
            ("nope", json!({})),
            ("list_files", Value::Null),
            ("list_files", json!([])),
            ("nope", json!("x")),
        ];

        for (name, arguments) in calls {
            let result = registry.call(name, &state, arguments).await;
            let text = result.text();
            if result.is_error() {
                assert!(text.starts_with(ERROR_PREFIX), "{name}: {text}");
            } else {
                assert!(
                    serde_json::from_str::<Value>(text).is_ok(),
                    "{name}: success text must be JSON"
                );
            }
        }
    }

    #[tokio::test]
    async fn null_arguments_are_treated_as_empty_object() {
        let registry = build_tool_registry().expect("registry");
        let state = test_state(MemoryStore::demo().await.expect("demo"));

        let with_null = registry.call("list_files", &state, Value::Null).await;
        let with_empty = registry.call("list_files", &state, json!({})).await;
        assert!(!with_null.is_error(), "{}", with_null.text());
        assert_eq!(with_null.text(), with_empty.text());
    }

    #[tokio::test]
    async fn non_object_arguments_are_error_content() {
        let registry = build_tool_registry().expect("registry");
        let state = test_state(MemoryStore::new());

        for arguments in [json!([]), json!("x"), json!(7), json!(true)] {
            let result = registry.call("get_fodi_info", &state, arguments).await;
            assert!(result.is_error());
            assert_eq!(
                result.text(),
                "Error: Invalid arguments for get_fodi_info: expected an object"
            );
        }
    }

    #[tokio::test]
    async fn unknown_name_wins_over_bad_arguments() {
        let registry = build_tool_registry().expect("registry");
        let state = test_state(MemoryStore::new());

        for arguments in [json!([]), json!("x"), Value::Null] {
            let result = registry.call("nope", &state, arguments).await;
            assert_eq!(result.text(), "Error: Unknown tool: nope");
        }
    }
}
