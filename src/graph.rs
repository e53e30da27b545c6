// ABOUTME: OneDrive client over Microsoft Graph implementing FileStore and AuthProvider
// ABOUTME: Handles code exchange, refresh-token grants with a cached access token, and drive item calls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{build_authorization_url, AuthProvider, TokenPair};
use crate::config::FodiConfig;
use crate::path;
use crate::types::{DriveError, FileKind, FileList, FileMeta, FileStore, StoreCapabilities};

/// Service name used in upstream error messages
const SERVICE: &str = "Microsoft Graph";

/// Per-request HTTP timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh the access token this long before it expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on `@odata.nextLink` pages followed for one listing
const MAX_PAGES: usize = 20;

/// Prefix Graph puts on `parentReference.path`
const PARENT_PREFIX: &str = "/drive/root:";

/// Fields requested for drive items
const SELECT_FIELDS: &str = "name,size,lastModifiedDateTime,file,folder,parentReference";

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<Instant>,
    refresh_token: Option<String>,
}

impl TokenState {
    fn valid_access_token(&self) -> Option<&str> {
        let expires_at = self.expires_at?;
        if Instant::now() + EXPIRY_MARGIN < expires_at {
            self.access_token.as_deref()
        } else {
            None
        }
    }

    fn store(&mut self, pair: &TokenPair) {
        self.access_token = Some(pair.access_token.clone());
        self.expires_at = Some(Instant::now() + Duration::from_secs(pair.expires_in));
        if let Some(refresh) = &pair.refresh_token {
            self.refresh_token = Some(refresh.clone());
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriveItem {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "lastModifiedDateTime")]
    last_modified: Option<String>,
    file: Option<FileFacet>,
    folder: Option<serde_json::Value>,
    #[serde(rename = "parentReference")]
    parent_reference: Option<ParentReference>,
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileFacet {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParentReference {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveItemPage {
    #[serde(default)]
    value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// OneDrive access through the Microsoft Graph REST API
///
/// Paths seen by callers are relative to `drive.root` from the config;
/// the client scopes them before each call and unscopes returned paths.
pub struct GraphClient {
    http: Client,
    config: FodiConfig,
    authorization_url: String,
    tokens: Mutex<TokenState>,
}

impl GraphClient {
    /// Create a client from validated configuration
    pub fn new(config: FodiConfig) -> Result<Self, DriveError> {
        config.require_client_id()?;
        let authorization_url = build_authorization_url(&config.oauth)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DriveError::internal(format!("Failed to build HTTP client: {e}")))?;

        let tokens = TokenState {
            refresh_token: config.oauth.refresh_token.clone(),
            ..TokenState::default()
        };

        Ok(Self {
            http,
            config,
            authorization_url,
            tokens: Mutex::new(tokens),
        })
    }

    fn token_endpoint(&self) -> String {
        format!(
            "{}/oauth2/v2.0/token",
            self.config.oauth.authority.trim_end_matches('/')
        )
    }

    /// Build a Graph URL addressing the drive item at a caller path
    ///
    /// The root is `me/drive/root`; other items use the colon path syntax
    /// `me/drive/root:/a/b:` followed by `suffix` segments.
    fn item_url(&self, caller_path: &str, suffix: &[&str]) -> Result<Url, DriveError> {
        let full = path::scoped(&self.config.drive.root, caller_path)?;
        let mut url = Url::parse(&self.config.drive.api_base).map_err(|e| {
            DriveError::config(format!(
                "Invalid API base '{}': {e}",
                self.config.drive.api_base
            ))
        })?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| DriveError::config("API base cannot carry a path"))?;
            segments.pop_if_empty().extend(["me", "drive"]);

            if full == path::ROOT {
                segments.push("root");
            } else {
                segments.push("root:");
                let parts: Vec<&str> = full.trim_start_matches('/').split('/').collect();
                let last = parts.len() - 1;
                for (i, part) in parts.iter().enumerate() {
                    if i == last {
                        segments.push(&format!("{part}:"));
                    } else {
                        segments.push(part);
                    }
                }
            }
            segments.extend(suffix);
        }

        Ok(url)
    }

    /// Return a valid access token, refreshing it when needed
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut tokens = self.tokens.lock().await;
        if let Some(token) = tokens.valid_access_token() {
            return Ok(token.to_owned());
        }

        let Some(refresh) = tokens.refresh_token.clone() else {
            return Err(DriveError::auth_failure(
                "Drive is not authorized yet; open the URL from get_auth_url and complete sign-in",
            ));
        };

        debug!("Refreshing Graph access token");
        let pair = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh.as_str()),
            ])
            .await?;
        tokens.store(&pair);
        Ok(pair.access_token)
    }

    /// POST a token request with the application credentials added
    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenPair, DriveError> {
        let oauth = &self.config.oauth;
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", oauth.client_id.as_str()),
            ("redirect_uri", oauth.redirect_uri.as_str()),
            ("scope", oauth.scope.as_str()),
        ];
        if let Some(secret) = &oauth.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(self.token_endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| DriveError::external_service("token endpoint", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Token request rejected");
            return Err(DriveError::auth_failure(format!(
                "Token request failed with HTTP {status}: {body}"
            )));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| DriveError::external_service("token endpoint", format!("bad JSON: {e}")))
    }

    /// GET a Graph URL with bearer auth and decode the JSON body
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        caller_path: &str,
    ) -> Result<T, DriveError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DriveError::external_service(SERVICE, e.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| DriveError::external_service(SERVICE, format!("bad JSON: {e}"))),
            StatusCode::NOT_FOUND => Err(DriveError::not_found(caller_path)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DriveError::auth_failure(
                format!("{SERVICE} rejected the access token (HTTP {status})"),
            )),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(DriveError::external_service(
                    SERVICE,
                    format!("HTTP {status}: {body}"),
                ))
            }
        }
    }

    /// Follow `@odata.nextLink` pages starting at `url`
    async fn get_pages(&self, url: Url, caller_path: &str) -> Result<Vec<DriveItem>, DriveError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0;

        while let Some(link) = next.take() {
            let page: DriveItemPage = self.get_json(&link, caller_path).await?;
            items.extend(page.value);
            pages += 1;
            if pages >= MAX_PAGES {
                if page.next_link.is_some() {
                    warn!(path = caller_path, pages, "Listing truncated at page limit");
                }
                break;
            }
            next = page.next_link;
        }

        Ok(items)
    }

    /// Caller-visible path of a search hit, derived from its parent reference
    fn search_hit_path(&self, item: &DriveItem) -> String {
        let parent = item
            .parent_reference
            .as_ref()
            .and_then(|p| p.path.as_deref())
            .and_then(|p| p.strip_prefix(PARENT_PREFIX))
            .unwrap_or("");
        let parent = if parent.is_empty() { path::ROOT } else { parent };
        let visible = path::unscoped(&self.config.drive.root, parent);
        path::join(visible, &item.name)
    }
}

fn to_meta(item: DriveItem, visible_path: String) -> FileMeta {
    let kind = if item.folder.is_some() {
        FileKind::Folder
    } else {
        FileKind::File
    };
    FileMeta {
        name: item.name,
        path: visible_path,
        kind,
        size: item.size,
        last_modified: item.last_modified,
        mime_type: item.file.and_then(|f| f.mime_type),
    }
}

#[async_trait]
impl FileStore for GraphClient {
    fn name(&self) -> &str {
        "onedrive"
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::NATIVE_SEARCH
            | StoreCapabilities::DOWNLOAD_URL
            | StoreCapabilities::MODIFIED_TIME
    }

    async fn list(&self, caller_path: &str) -> Result<FileList, DriveError> {
        let dir = path::normalize(caller_path)?;
        let mut url = self.item_url(&dir, &["children"])?;
        url.query_pairs_mut().append_pair("$select", SELECT_FIELDS);

        let items = self
            .get_pages(url, &dir)
            .await?
            .into_iter()
            .map(|item| {
                let visible = path::join(&dir, &item.name);
                to_meta(item, visible)
            })
            .collect();

        Ok(FileList::new(dir, items))
    }

    async fn search(&self, query: &str) -> Result<FileList, DriveError> {
        let escaped = query.replace('\'', "''");
        let segment = format!("search(q='{escaped}')");
        let mut url = self.item_url(path::ROOT, &[segment.as_str()])?;
        url.query_pairs_mut().append_pair("$select", SELECT_FIELDS);

        let items = self
            .get_pages(url, path::ROOT)
            .await?
            .into_iter()
            .map(|item| {
                let visible = self.search_hit_path(&item);
                to_meta(item, visible)
            })
            .collect();

        Ok(FileList::new(path::ROOT, items))
    }

    async fn info(&self, caller_path: &str) -> Result<FileMeta, DriveError> {
        let target = path::normalize(caller_path)?;
        let mut url = self.item_url(&target, &[])?;
        url.query_pairs_mut().append_pair("$select", SELECT_FIELDS);

        let item: DriveItem = self.get_json(url.as_str(), &target).await?;
        Ok(to_meta(item, target))
    }

    async fn download_url(&self, caller_path: &str) -> Result<String, DriveError> {
        let target = path::normalize(caller_path)?;
        // downloadUrl is only returned when no $select is applied
        let url = self.item_url(&target, &[])?;
        let item: DriveItem = self.get_json(url.as_str(), &target).await?;

        if item.folder.is_some() {
            return Err(DriveError::invalid_input(format!(
                "Cannot download a folder: {target}"
            )));
        }
        item.download_url.ok_or_else(|| {
            DriveError::external_service(SERVICE, format!("no download URL returned for {target}"))
        })
    }
}

#[async_trait]
impl AuthProvider for GraphClient {
    fn authorization_url(&self) -> String {
        self.authorization_url.clone()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, DriveError> {
        if code.trim().is_empty() {
            return Err(DriveError::invalid_input("Authorization code is empty"));
        }

        let pair = self
            .request_token(&[("grant_type", "authorization_code"), ("code", code)])
            .await?;
        self.tokens.lock().await.store(&pair);
        info!(
            has_refresh_token = pair.refresh_token.is_some(),
            "Drive authorization completed"
        );
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(root: &str) -> GraphClient {
        let mut config = FodiConfig::default();
        config.oauth.client_id = "client".to_owned();
        config.drive.root = root.to_owned();
        GraphClient::new(config).expect("client")
    }

    #[test]
    fn new_requires_client_id() {
        assert!(GraphClient::new(FodiConfig::default()).is_err());
    }

    #[test]
    fn item_url_for_root() {
        let url = client("/").item_url("/", &["children"]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/me/drive/root/children"
        );
    }

    #[test]
    fn item_url_uses_colon_syntax_and_escapes() {
        let url = client("/")
            .item_url("/My Docs/a.txt", &[])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/me/drive/root:/My%20Docs/a.txt:"
        );
    }

    #[test]
    fn item_url_scopes_under_root() {
        let url = client("/Public").item_url("/", &["children"]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/me/drive/root:/Public:/children"
        );
    }

    #[test]
    fn search_hit_path_strips_parent_prefix_and_root() {
        let graph = client("/Public");
        let item: DriveItem = serde_json::from_value(serde_json::json!({
            "name": "a.txt",
            "size": 3,
            "file": {"mimeType": "text/plain"},
            "parentReference": {"path": "/drive/root:/Public/docs"}
        }))
        .expect("item");
        assert_eq!(graph.search_hit_path(&item), "/docs/a.txt");

        let meta = to_meta(item, "/docs/a.txt".to_owned());
        assert_eq!(meta.kind, FileKind::File);
        assert_eq!(meta.mime_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn access_token_without_refresh_token_is_auth_failure() {
        let err = client("/").access_token().await.expect_err("unauthorized");
        assert_eq!(err.kind, crate::types::ErrorKind::AuthFailure);
    }
}
