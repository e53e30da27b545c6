// ABOUTME: Drive browsing tools: list_files, search_files, get_file_info, get_download_url
// ABOUTME: Thin adapters from typed arguments to FileStore calls with contextual errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use fodi::path;
use fodi::types::{DriveError, FileList, FileMeta, StoreCapabilities};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::TypedTool;
use crate::state::ServerState;

const FALLBACK_SEARCH_NOTE: &str =
    "Matched item names in a single folder only; this search is neither recursive nor full-text.";

fn default_root() -> String {
    path::ROOT.to_owned()
}

/// Arguments for `list_files`
#[derive(Debug, Deserialize)]
pub struct ListFilesArgs {
    /// Folder to list
    #[serde(default = "default_root")]
    pub path: String,
}

/// Arguments for `search_files`
#[derive(Debug, Deserialize)]
pub struct SearchFilesArgs {
    /// Substring to look for in item names
    pub query: String,
    /// Folder to search (fallback) or to restrict results to (native)
    #[serde(default)]
    pub path: Option<String>,
}

/// Arguments for tools addressing a single item
#[derive(Debug, Deserialize)]
pub struct PathArgs {
    /// Drive-absolute item path
    pub path: String,
}

fn path_schema(description: &str, required: bool) -> Value {
    let required: &[&str] = if required { &["path"] } else { &[] };
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": description
            }
        },
        "required": required
    })
}

/// `list_files` tool
pub struct ListFiles;

#[async_trait]
impl TypedTool for ListFiles {
    const NAME: &'static str = "list_files";
    type Args = ListFilesArgs;

    fn description(&self) -> &'static str {
        "List files and folders in a drive folder (defaults to the root)"
    }

    fn input_schema(&self) -> Value {
        path_schema("Folder path to list, e.g. /Documents (default: /)", false)
    }

    async fn run(&self, state: &ServerState, args: ListFilesArgs) -> Result<Value, DriveError> {
        let listing = state
            .store
            .list(&args.path)
            .await
            .map_err(|e| e.with_context("Failed to list files"))?;

        Ok(json!({
            "path": listing.path,
            "total": listing.len(),
            "files": listing.items,
        }))
    }
}

/// `search_files` tool
pub struct SearchFiles;

impl SearchFiles {
    async fn native(
        state: &ServerState,
        query: &str,
        scope: Option<&str>,
    ) -> Result<Vec<FileMeta>, DriveError> {
        let found = state.store.search(query).await?;
        let Some(scope) = scope else {
            return Ok(found.items);
        };

        let scope = path::normalize(scope)?;
        if scope == path::ROOT {
            return Ok(found.items);
        }
        let prefix = format!("{scope}/");
        Ok(found
            .items
            .into_iter()
            .filter(|item| item.path.starts_with(&prefix))
            .collect())
    }

    async fn fallback(
        state: &ServerState,
        query: &str,
        folder: &str,
    ) -> Result<Vec<FileMeta>, DriveError> {
        let listing = state.store.list(folder).await?;
        Ok(filter_by_name(listing, query))
    }
}

/// Keep the items whose name contains `query`, ignoring case
pub fn filter_by_name(listing: FileList, query: &str) -> Vec<FileMeta> {
    let needle = query.to_lowercase();
    listing
        .items
        .into_iter()
        .filter(|item| item.name.to_lowercase().contains(&needle))
        .collect()
}

#[async_trait]
impl TypedTool for SearchFiles {
    const NAME: &'static str = "search_files";
    type Args = SearchFilesArgs;

    fn description(&self) -> &'static str {
        "Search for files by name. Uses the drive's native search when available, \
         otherwise matches names within a single folder"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to search for in file names"
                },
                "path": {
                    "type": "string",
                    "description": "Folder to search within (default: /)"
                }
            },
            "required": ["query"]
        })
    }

    async fn run(&self, state: &ServerState, args: SearchFilesArgs) -> Result<Value, DriveError> {
        let query = args.query.trim();
        if query.is_empty() {
            return Err(DriveError::invalid_input("Search query must not be empty")
                .with_context("Failed to search files"));
        }

        let native = state
            .store
            .capabilities()
            .contains(StoreCapabilities::NATIVE_SEARCH);
        debug!(query, native, "Searching drive");

        let outcome = if native {
            Self::native(state, query, args.path.as_deref()).await
        } else {
            let folder = args.path.as_deref().unwrap_or(path::ROOT);
            Self::fallback(state, query, folder).await
        };
        let results = outcome.map_err(|e| e.with_context("Failed to search files"))?;

        let mut body = json!({
            "query": query,
            "total": results.len(),
            "results": results,
        });
        if !native {
            body["note"] = Value::from(FALLBACK_SEARCH_NOTE);
        }
        Ok(body)
    }
}

/// `get_file_info` tool
pub struct GetFileInfo;

#[async_trait]
impl TypedTool for GetFileInfo {
    const NAME: &'static str = "get_file_info";
    type Args = PathArgs;

    fn description(&self) -> &'static str {
        "Get metadata (size, type, modification time) for a file or folder"
    }

    fn input_schema(&self) -> Value {
        path_schema("Path of the file or folder", true)
    }

    async fn run(&self, state: &ServerState, args: PathArgs) -> Result<Value, DriveError> {
        let meta = state
            .store
            .info(&args.path)
            .await
            .map_err(|e| e.with_context("Failed to get file info"))?;
        serde_json::to_value(meta)
            .map_err(|e| DriveError::internal(format!("Failed to encode file info: {e}")))
    }
}

/// `get_download_url` tool
pub struct GetDownloadUrl;

#[async_trait]
impl TypedTool for GetDownloadUrl {
    const NAME: &'static str = "get_download_url";
    type Args = PathArgs;

    fn description(&self) -> &'static str {
        "Get a direct download URL for a file"
    }

    fn input_schema(&self) -> Value {
        path_schema("Path of the file to download", true)
    }

    async fn run(&self, state: &ServerState, args: PathArgs) -> Result<Value, DriveError> {
        let url = state
            .store
            .download_url(&args.path)
            .await
            .map_err(|e| e.with_context("Failed to get download URL"))?;

        Ok(json!({
            "path": args.path,
            "download_url": url,
        }))
    }
}
