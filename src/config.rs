//! Configuration loading and management
//!
//! Handles parsing of `.taskdeck.toml` in the taskdeck root directory.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::NotificationSettings;

/// Name of the config file inside the root directory
pub const CONFIG_FILE: &str = ".taskdeck.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Notification endpoint and deployment-level destinations
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Reference notification server
    #[serde(default)]
    pub server: ServerConfig,

    /// Comment author defaults
    #[serde(default)]
    pub author: AuthorConfig,
}

/// Hosted backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the backend project (e.g. `https://xyz.example.co`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Public (anon) API key sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,

    /// Object storage bucket for attachments
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Where magic-link emails redirect after sign-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

fn default_bucket() -> String {
    "attachments".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            bucket: default_bucket(),
            redirect_to: None,
        }
    }
}

impl RemoteConfig {
    /// URL and key, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let key = self
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())?;
        Some((url, key))
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Endpoint receiving `{channel, to, subject, message}` posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Deployment default email destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_email: Option<String>,

    /// Deployment default Slack destination (channel or webhook)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_slack: Option<String>,
}

impl NotifyConfig {
    /// Deployment defaults as a settings record.
    pub fn defaults(&self) -> NotificationSettings {
        NotificationSettings {
            default_email: self.default_email.clone(),
            default_slack: self.default_slack.clone(),
        }
    }
}

/// Reference notification server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Comment author configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorConfig {
    /// Author name when none is given
    #[serde(default = "default_author")]
    pub default: String,
}

fn default_author() -> String {
    "anonymous".to_string()
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            default: default_author(),
        }
    }
}

impl Config {
    /// Load configuration from a `.taskdeck.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the root directory, or return defaults
    pub fn load_from_root(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Override remote connection fields, e.g. from environment variables.
    pub fn with_remote_overrides(mut self, url: Option<String>, anon_key: Option<String>) -> Self {
        if let Some(url) = url.filter(|v| !v.trim().is_empty()) {
            self.remote.url = Some(url);
        }
        if let Some(key) = anon_key.filter(|v| !v.trim().is_empty()) {
            self.remote.anon_key = Some(key);
        }
        self
    }

    fn validate(&self) -> crate::error::Result<()> {
        if let Some(url) = self.remote.url.as_deref() {
            validate_http_url(url, "remote.url")?;
        }
        if self.remote.bucket.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "remote.bucket cannot be empty".to_string(),
            ));
        }
        if let Some(endpoint) = self.notify.endpoint.as_deref() {
            validate_http_url(endpoint, "notify.endpoint")?;
        }
        self.server.bind.parse::<SocketAddr>().map_err(|err| {
            crate::error::Error::InvalidConfig(format!(
                "server.bind: invalid address '{}': {err}",
                self.server.bind
            ))
        })?;
        if self.author.default.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "author.default cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_http_url(url: &str, field: &str) -> crate::error::Result<()> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(crate::error::Error::InvalidConfig(format!(
            "{field}: expected an http(s) URL, got '{trimmed}'"
        )))
    }
}
