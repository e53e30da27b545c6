// ABOUTME: OAuth 2.0 authorization-code collaborator for drive access
// ABOUTME: Defines AuthProvider trait, TokenPair, and the authorization URL builder
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::OAuthConfig;
use crate::types::DriveError;

/// Tokens returned by a successful code exchange or refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer token for API calls
    pub access_token: String,
    /// Long-lived token used to mint new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: u64,
    /// Token type (normally "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Granted scopes, space separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

/// OAuth flow used to authorize drive access
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// URL the user opens to grant access
    fn authorization_url(&self) -> String;

    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<TokenPair, DriveError>;
}

/// Build the authorization-code URL for the configured OAuth application
///
/// # Errors
///
/// Returns a config error if the authority is not a valid URL.
pub fn build_authorization_url(config: &OAuthConfig) -> Result<String, DriveError> {
    let base = format!("{}/oauth2/v2.0/authorize", config.authority.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .map_err(|e| DriveError::config(format!("Invalid OAuth authority '{base}': {e}")))?;

    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scope)
        .append_pair("response_mode", "query");

    Ok(url.into())
}

/// Auth provider for stores that need no authorization
///
/// The authorization URL is still derived from config so `get_auth_url`
/// answers consistently; code exchange is rejected.
pub struct NoAuth {
    authorization_url: String,
}

impl NoAuth {
    /// Create a provider that reports the configured authorization URL
    pub fn new(config: &OAuthConfig) -> Result<Self, DriveError> {
        Ok(Self {
            authorization_url: build_authorization_url(config)?,
        })
    }
}

#[async_trait]
impl AuthProvider for NoAuth {
    fn authorization_url(&self) -> String {
        self.authorization_url.clone()
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenPair, DriveError> {
        Err(DriveError::unsupported(
            "code exchange (store does not require authorization)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig {
            client_id: "abc-123".to_owned(),
            redirect_uri: "http://localhost:3000/oauth/callback".to_owned(),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn authorization_url_carries_query() {
        let url = build_authorization_url(&test_config()).expect("url");
        assert!(url.starts_with("https://login.microsoftonline.com/common/oauth2/v2.0/authorize?"));
        assert!(url.contains("client_id=abc-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Foauth%2Fcallback"));
    }

    #[test]
    fn invalid_authority_is_config_error() {
        let config = OAuthConfig {
            authority: "not a url".to_owned(),
            ..test_config()
        };
        let err = build_authorization_url(&config).expect_err("invalid");
        assert_eq!(err.kind, crate::types::ErrorKind::Config);
    }

    #[test]
    fn token_pair_defaults() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access_token":"t","expires_in":3600}"#).expect("parse");
        assert_eq!(pair.token_type, "Bearer");
        assert!(pair.refresh_token.is_none());
    }

    #[tokio::test]
    async fn no_auth_rejects_exchange() {
        let auth = NoAuth::new(&test_config()).expect("auth");
        assert!(auth.authorization_url().contains("abc-123"));
        assert!(auth.exchange_code("code").await.is_err());
    }
}
