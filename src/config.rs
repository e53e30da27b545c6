// ABOUTME: Configuration for FODI drive collaborators: OAuth application and drive settings
// ABOUTME: Layers defaults, an optional TOML file, and FODI_* environment overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::num::ParseIntError;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::DriveError;

/// Default OAuth authority (multi-tenant Microsoft identity platform)
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common";

/// Default Microsoft Graph API base URL
pub const DEFAULT_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Default OAuth scopes: read access plus a refresh token
pub const DEFAULT_SCOPE: &str = "offline_access Files.Read.All";

/// Default redirect URI served by the HTTP transport
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/oauth/callback";

/// OAuth application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Application (client) id
    pub client_id: String,
    /// Client secret for confidential apps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Redirect URI registered for the application
    pub redirect_uri: String,
    /// Space-separated scopes requested during authorization
    pub scope: String,
    /// Identity platform authority URL
    pub authority: String,
    /// Previously issued refresh token, if the drive was already authorized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_owned(),
            scope: DEFAULT_SCOPE.to_owned(),
            authority: DEFAULT_AUTHORITY.to_owned(),
            refresh_token: None,
        }
    }
}

/// Drive API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Graph API base URL
    pub api_base: String,
    /// Drive folder exposed as `/` to clients
    pub root: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            root: crate::path::ROOT.to_owned(),
        }
    }
}

/// Top-level FODI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FodiConfig {
    /// OAuth application settings
    pub oauth: OAuthConfig,
    /// Drive API settings
    pub drive: DriveConfig,
}

impl FodiConfig {
    /// Load configuration: defaults, then an optional file, then the environment
    ///
    /// With the `config-file` feature, `explicit` must exist when given;
    /// otherwise the default path is used if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DriveError> {
        let mut config = Self::from_file_layer(explicit)?;
        config.apply_env_with(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `FODI_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_with(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("FODI_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Some(v) = non_empty("FODI_CLIENT_SECRET") {
            self.oauth.client_secret = Some(v);
        }
        if let Some(v) = non_empty("FODI_REDIRECT_URI") {
            self.oauth.redirect_uri = v;
        }
        if let Some(v) = non_empty("FODI_SCOPE") {
            self.oauth.scope = v;
        }
        if let Some(v) = non_empty("FODI_AUTHORITY") {
            self.oauth.authority = v;
        }
        if let Some(v) = non_empty("FODI_REFRESH_TOKEN") {
            self.oauth.refresh_token = Some(v);
        }
        if let Some(v) = non_empty("FODI_API_BASE") {
            self.drive.api_base = v;
        }
        if let Some(v) = non_empty("FODI_ROOT") {
            self.drive.root = v;
        }
    }

    /// Check values that would otherwise fail on first use
    pub fn validate(&self) -> Result<(), DriveError> {
        crate::path::normalize(&self.drive.root)
            .map_err(|e| DriveError::config(format!("Invalid drive root: {}", e.message)))?;
        if self.drive.api_base.trim().is_empty() {
            return Err(DriveError::config("drive.api_base must not be empty"));
        }
        Ok(())
    }

    /// Check that the OAuth application is configured (needed by remote stores)
    pub fn require_client_id(&self) -> Result<(), DriveError> {
        if self.oauth.client_id.trim().is_empty() {
            return Err(DriveError::config(
                "OAuth client id is not set (oauth.client_id or FODI_CLIENT_ID)",
            ));
        }
        Ok(())
    }

    #[cfg(feature = "config-file")]
    fn from_file_layer(explicit: Option<&Path>) -> Result<Self, DriveError> {
        if let Some(path) = explicit {
            return load_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => load_file(&path),
            _ => Ok(Self::default()),
        }
    }

    #[cfg(not(feature = "config-file"))]
    fn from_file_layer(explicit: Option<&Path>) -> Result<Self, DriveError> {
        if let Some(path) = explicit {
            return Err(DriveError::config(format!(
                "Cannot read {}: built without the config-file feature",
                path.display()
            )));
        }
        Ok(Self::default())
    }
}

/// Default configuration file location (`<config_dir>/fodi/config.toml`)
#[cfg(feature = "config-file")]
pub fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fodi").join("config.toml"))
}

/// Parse a TOML configuration file
#[cfg(feature = "config-file")]
pub fn load_file(path: &Path) -> Result<FodiConfig, DriveError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DriveError::config(format!("Failed to read {}: {e}", path.display())))?;
    toml::from_str(&raw)
        .map_err(|e| DriveError::config(format!("Failed to parse {}: {e}", path.display())))
}

/// Parse a duration value from a string (in seconds)
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a `u64`.
pub fn parse_secs(input: &str) -> Result<Duration, ParseIntError> {
    input.trim().parse::<u64>().map(Duration::from_secs)
}
