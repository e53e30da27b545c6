// ABOUTME: FODI drive library exposing a cloud drive to MCP tools and event streams
// ABOUTME: Re-exports the file model, store and auth collaborators, and configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # FODI Drive Collaborators
//!
//! The pieces of a cloud drive that the FODI MCP server calls into but
//! does not own: a read-only [`FileStore`](types::FileStore), an OAuth
//! [`AuthProvider`](auth::AuthProvider), and their configuration.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fodi::memory::MemoryStore;
//! use fodi::types::{DriveError, FileStore};
//!
//! # async fn example() -> Result<(), DriveError> {
//! let store = MemoryStore::demo().await?;
//! let listing = store.list("/Documents").await?;
//! for item in &listing.items {
//!     println!("{} ({} bytes)", item.path, item.size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: `FileStore` trait, file model, capability flags, errors
//! - [`auth`]: `AuthProvider` trait, token pair, authorization URL builder
//! - [`config`]: OAuth and drive configuration (file + environment)
//! - [`path`]: drive path normalization and root scoping
//! - [`memory`]: in-memory store
//! - `graph`: OneDrive Microsoft Graph client (`graph-api` feature)

/// Core types: store trait, file model, and errors
pub mod types;

/// OAuth authorization collaborator
pub mod auth;
/// Configuration for drive collaborators
pub mod config;
/// In-memory file store
pub mod memory;
/// Drive path normalization
pub mod path;

/// OneDrive client over Microsoft Graph
#[cfg(feature = "graph-api")]
pub mod graph;

pub use auth::{AuthProvider, NoAuth, TokenPair};
pub use config::FodiConfig;
#[cfg(feature = "graph-api")]
pub use graph::GraphClient;
pub use memory::MemoryStore;
pub use types::{DriveError, ErrorKind, FileKind, FileList, FileMeta, FileStore, StoreCapabilities};
