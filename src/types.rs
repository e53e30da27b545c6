// ABOUTME: Core types for the FODI drive library: file model, store trait, and error type
// ABOUTME: Provides FileStore trait, FileMeta/FileList, capability flags, and DriveError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Core Types
//!
//! Self-contained type definitions shared by every FODI collaborator.
//! A [`FileStore`] is the only contract the MCP server needs from a
//! cloud drive; everything it returns is expressed with these types.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Type
// ============================================================================

/// Error type for drive, auth, and tool operations
#[derive(Debug, Clone)]
pub struct DriveError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of errors produced by drive collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Internal error (bug, unexpected state)
    Internal,
    /// Requested path or item does not exist
    NotFound,
    /// Caller supplied malformed or missing input
    InvalidInput,
    /// Operation not supported by this store
    Unsupported,
    /// Upstream HTTP service failure or bad response
    ExternalService,
    /// Authentication or authorization failure
    AuthFailure,
    /// Configuration error
    Config,
}

impl DriveError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }

    /// Create a not-found error for the given path
    pub fn not_found(path: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("Path not found: {}", path.into()),
        }
    }

    /// Create an invalid-input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unsupported,
            message: format!("Operation not supported: {}", operation.into()),
        }
    }

    /// Create an external service error
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ExternalService,
            message: format!("{}: {}", service.into(), message.into()),
        }
    }

    /// Create an auth failure error
    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::AuthFailure,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Config,
            message: message.into(),
        }
    }

    /// Prefix the message with the failed operation, keeping the kind
    ///
    /// `err.with_context("Failed to list files")` turns `Path not found: /x`
    /// into `Failed to list files: Path not found: /x`.
    pub fn with_context(self, operation: &str) -> Self {
        Self {
            kind: self.kind,
            message: format!("{operation}: {}", self.message),
        }
    }
}

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DriveError {}

// ============================================================================
// Capability Flags
// ============================================================================

bitflags::bitflags! {
    /// File store capability flags
    ///
    /// Lets callers pick a degraded strategy when a store lacks a feature,
    /// e.g. directory filtering in place of native search.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StoreCapabilities: u8 {
        /// Store implements `search` natively (recursive / full-text)
        const NATIVE_SEARCH = 0b0000_0001;
        /// Store can mint direct download URLs
        const DOWNLOAD_URL = 0b0000_0010;
        /// Store reports item modification times
        const MODIFIED_TIME = 0b0000_0100;
    }
}

// ============================================================================
// File Model
// ============================================================================

/// Whether a drive item is a file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Regular file
    File,
    /// Folder containing other items
    Folder,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// Metadata describing a single drive item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Item name (last path segment)
    pub name: String,
    /// Normalized absolute path within the drive
    pub path: String,
    /// File or folder
    pub kind: FileKind,
    /// Size in bytes (folders report the store's aggregate, or 0)
    #[serde(default)]
    pub size: u64,
    /// Last modification time as reported by the store (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// MIME type, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileMeta {
    /// Create file metadata for the given path and size
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        Self {
            name: crate::path::file_name(&path).to_owned(),
            path,
            kind: FileKind::File,
            size,
            last_modified: None,
            mime_type: None,
        }
    }

    /// Create folder metadata for the given path
    pub fn folder(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: crate::path::file_name(&path).to_owned(),
            path,
            kind: FileKind::Folder,
            size: 0,
            last_modified: None,
            mime_type: None,
        }
    }

    /// Set the modification time
    #[must_use]
    pub fn with_last_modified(mut self, modified: impl Into<String>) -> Self {
        self.last_modified = Some(modified.into());
        self
    }

    /// Set the MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Returns `true` when the item is a folder
    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }
}

/// Listing of a directory (or search results scoped to a path)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    /// Directory the listing was taken from
    pub path: String,
    /// Items in store order
    pub items: Vec<FileMeta>,
}

impl FileList {
    /// Create a listing for the given path
    pub fn new(path: impl Into<String>, items: Vec<FileMeta>) -> Self {
        Self {
            path: path.into(),
            items,
        }
    }

    /// Number of items in the listing
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when the listing is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// File Store Trait
// ============================================================================

/// Read-only access to a cloud drive
///
/// Implemented by the in-memory store and the OneDrive Graph client. Paths
/// are drive-absolute (`/Documents/report.docx`); implementations normalize
/// them with [`crate::path::normalize`].
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Short store name for logs and status output
    fn name(&self) -> &str;

    /// Features this store supports
    fn capabilities(&self) -> StoreCapabilities;

    /// List the direct children of a folder
    async fn list(&self, path: &str) -> Result<FileList, DriveError>;

    /// Search the drive natively
    ///
    /// Stores without [`StoreCapabilities::NATIVE_SEARCH`] keep this default.
    async fn search(&self, _query: &str) -> Result<FileList, DriveError> {
        Err(DriveError::unsupported(format!("{} search", self.name())))
    }

    /// Fetch metadata for a single item
    async fn info(&self, path: &str) -> Result<FileMeta, DriveError>;

    /// Produce a direct download URL for a file
    async fn download_url(&self, path: &str) -> Result<String, DriveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_context_prefixes_message_and_keeps_kind() {
        let err = DriveError::not_found("/missing").with_context("Failed to list files");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Failed to list files: Path not found: /missing");
    }

    #[test]
    fn display_includes_kind() {
        let err = DriveError::config("bad port");
        assert_eq!(err.to_string(), "Config: bad port");
    }

    #[test]
    fn file_meta_derives_name_from_path() {
        let meta = FileMeta::file("/Documents/report.docx", 42);
        assert_eq!(meta.name, "report.docx");
        assert!(!meta.is_folder());
        assert!(FileMeta::folder("/Documents").is_folder());
    }

    #[test]
    fn file_meta_omits_unknown_optionals() {
        let json = serde_json::to_value(FileMeta::file("/a.txt", 1)).expect("serialize");
        assert_eq!(json["kind"], "file");
        assert!(json.get("last_modified").is_none());
        assert!(json.get("mime_type").is_none());
    }

    #[test]
    fn capabilities_combine() {
        let caps = StoreCapabilities::NATIVE_SEARCH | StoreCapabilities::DOWNLOAD_URL;
        assert!(caps.contains(StoreCapabilities::NATIVE_SEARCH));
        assert!(!caps.contains(StoreCapabilities::MODIFIED_TIME));
    }
}
