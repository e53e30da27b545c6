// ABOUTME: In-memory FileStore backed by a sorted path map
// ABOUTME: Used by the memory store mode and as the collaborator in tests; has no native search
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::path;
use crate::types::{DriveError, FileList, FileMeta, FileStore, StoreCapabilities};

/// Default base URL for download links minted by the memory store
const DEFAULT_DOWNLOAD_BASE: &str = "http://localhost:3000/files";

/// Drive contents held in process memory
///
/// Parent folders are created implicitly when an item is inserted, so a
/// listing of any ancestor of an inserted path succeeds.
pub struct MemoryStore {
    items: RwLock<BTreeMap<String, FileMeta>>,
    download_base: String,
}

impl MemoryStore {
    /// Create an empty store containing only the root folder
    pub fn new() -> Self {
        let mut items = BTreeMap::new();
        items.insert(path::ROOT.to_owned(), FileMeta::folder(path::ROOT));
        Self {
            items: RwLock::new(items),
            download_base: DEFAULT_DOWNLOAD_BASE.to_owned(),
        }
    }

    /// Set the base URL used for download links
    #[must_use]
    pub fn with_download_base(mut self, base: impl Into<String>) -> Self {
        self.download_base = base.into().trim_end_matches('/').to_owned();
        self
    }

    /// Store seeded with a small sample drive
    pub async fn demo() -> Result<Self, DriveError> {
        let store = Self::new();
        store
            .insert(FileMeta::file("/Documents/report.docx", 48_213).with_mime_type(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ))
            .await?;
        store
            .insert(FileMeta::file("/Documents/document.txt", 1_204).with_mime_type("text/plain"))
            .await?;
        store
            .insert(FileMeta::file("/Pictures/image.png", 301_877).with_mime_type("image/png"))
            .await?;
        store
            .insert(FileMeta::file("/README.md", 512).with_mime_type("text/markdown"))
            .await?;
        Ok(store)
    }

    /// Insert or replace an item, creating missing parent folders
    pub async fn insert(&self, meta: FileMeta) -> Result<(), DriveError> {
        let normalized = path::normalize(&meta.path)?;
        let mut items = self.items.write().await;

        let mut dir = path::parent(&normalized).to_owned();
        while dir != path::ROOT {
            items
                .entry(dir.clone())
                .or_insert_with(|| FileMeta::folder(dir.clone()));
            dir = path::parent(&dir).to_owned();
        }

        let meta = FileMeta {
            name: path::file_name(&normalized).to_owned(),
            path: normalized.clone(),
            ..meta
        };
        items.insert(normalized, meta);
        Ok(())
    }

    /// Remove an item and everything beneath it, returning the removed entry
    pub async fn remove(&self, target: &str) -> Result<Option<FileMeta>, DriveError> {
        let normalized = path::normalize(target)?;
        if normalized == path::ROOT {
            return Err(DriveError::invalid_input("Cannot remove the drive root"));
        }
        let prefix = format!("{normalized}/");
        let mut items = self.items.write().await;
        items.retain(|key, _| !key.starts_with(&prefix));
        Ok(items.remove(&normalized))
    }

    async fn lookup(&self, target: &str) -> Result<FileMeta, DriveError> {
        let normalized = path::normalize(target)?;
        self.items
            .read()
            .await
            .get(&normalized)
            .cloned()
            .ok_or_else(|| DriveError::not_found(normalized))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::DOWNLOAD_URL
    }

    async fn list(&self, target: &str) -> Result<FileList, DriveError> {
        let dir = self.lookup(target).await?;
        if !dir.is_folder() {
            return Err(DriveError::invalid_input(format!(
                "Not a folder: {}",
                dir.path
            )));
        }

        let items: Vec<FileMeta> = self
            .items
            .read()
            .await
            .values()
            .filter(|meta| meta.path != path::ROOT && path::parent(&meta.path) == dir.path)
            .cloned()
            .collect();

        debug!(path = %dir.path, count = items.len(), "Listed memory folder");
        Ok(FileList::new(dir.path, items))
    }

    async fn info(&self, target: &str) -> Result<FileMeta, DriveError> {
        self.lookup(target).await
    }

    async fn download_url(&self, target: &str) -> Result<String, DriveError> {
        let meta = self.lookup(target).await?;
        if meta.is_folder() {
            return Err(DriveError::invalid_input(format!(
                "Cannot download a folder: {}",
                meta.path
            )));
        }
        Ok(format!("{}{}", self.download_base, meta.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[tokio::test]
    async fn insert_creates_parents() {
        let store = MemoryStore::new();
        store
            .insert(FileMeta::file("/a/b/c.txt", 3))
            .await
            .expect("insert");

        let root = store.list("/").await.expect("list root");
        assert_eq!(root.len(), 1);
        assert_eq!(root.items[0].path, "/a");
        assert!(root.items[0].is_folder());

        let nested = store.list("/a/b/").await.expect("list nested");
        assert_eq!(nested.path, "/a/b");
        assert_eq!(nested.items[0].name, "c.txt");
    }

    #[tokio::test]
    async fn list_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.list("/nope").await.expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_file_is_invalid_input() {
        let store = MemoryStore::demo().await.expect("demo");
        let err = store.list("/README.md").await.expect_err("file");
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn download_url_uses_base() {
        let store = MemoryStore::new().with_download_base("https://files.example/");
        store
            .insert(FileMeta::file("/x.bin", 1))
            .await
            .expect("insert");
        let url = store.download_url("x.bin").await.expect("url");
        assert_eq!(url, "https://files.example/x.bin");
        assert!(store.download_url("/").await.is_err());
    }

    #[tokio::test]
    async fn remove_drops_subtree() {
        let store = MemoryStore::demo().await.expect("demo");
        let removed = store.remove("/Documents").await.expect("remove");
        assert!(removed.is_some());
        assert!(store.info("/Documents/report.docx").await.is_err());
        assert!(store.remove("/").await.is_err());
    }

    #[tokio::test]
    async fn search_is_unsupported() {
        let store = MemoryStore::new();
        let err = store.search("doc").await.expect_err("unsupported");
        assert_eq!(err.kind, ErrorKind::Unsupported);
        assert!(!store
            .capabilities()
            .contains(StoreCapabilities::NATIVE_SEARCH));
    }
}
