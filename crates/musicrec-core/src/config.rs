//! Application configuration management.
//!
//! This module handles loading the application configuration:
//! backend URL, OAuth client settings, request budget and where the
//! session is kept. Every field is optional and falls back to a default.
//!
//! Configuration is stored at `~/.config/musicrec/config.json`; the
//! `MUSICREC_*` environment variables override it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::auth::{
    FileSessionPersistence, KeyringSessionPersistence, MemorySessionPersistence,
    SessionPersistence,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "musicrec";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_REDIRECT_ORIGIN: &str = "http://127.0.0.1:3000";
const DEFAULT_SCOPE: &str = "user-library-read";

/// How long a failed login stays on screen before returning to login
const DEFAULT_FAILURE_REDIRECT_DELAY_MS: u64 = 3000;

/// How long the loopback listener waits for the provider redirect
const DEFAULT_CALLBACK_WAIT_SECS: u64 = 300;

const ENV_API_URL: &str = "MUSICREC_API_URL";
const ENV_CLIENT_ID: &str = "MUSICREC_CLIENT_ID";
const ENV_AUTHORIZE_URL: &str = "MUSICREC_AUTHORIZE_URL";
const ENV_REDIRECT_ORIGIN: &str = "MUSICREC_REDIRECT_ORIGIN";
const ENV_SESSION_BACKEND: &str = "MUSICREC_SESSION_BACKEND";

/// Where the session record lives between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    File,
    Keyring,
    /// Nothing survives the process
    Memory,
}

impl SessionBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(SessionBackend::File),
            "keyring" => Some(SessionBackend::Keyring),
            "memory" => Some(SessionBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub client_id: Option<String>,
    pub authorize_url: Option<String>,
    pub redirect_origin: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub request_timeout_secs: Option<u64>,
    pub failure_redirect_delay_ms: Option<u64>,
    pub callback_wait_secs: Option<u64>,
    #[serde(default)]
    pub session_backend: SessionBackend,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        debug!(api_base_url = %config.api_base_url(), "Config loaded");
        Ok(config)
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_API_URL) {
            self.api_base_url = Some(v);
        }
        if let Some(v) = get(ENV_CLIENT_ID) {
            self.client_id = Some(v);
        }
        if let Some(v) = get(ENV_AUTHORIZE_URL) {
            self.authorize_url = Some(v);
        }
        if let Some(v) = get(ENV_REDIRECT_ORIGIN) {
            self.redirect_origin = Some(v);
        }
        if let Some(backend) = get(ENV_SESSION_BACKEND).as_deref().and_then(SessionBackend::parse) {
            self.session_backend = backend;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn authorize_url(&self) -> String {
        self.authorize_url
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string())
    }

    pub fn redirect_origin(&self) -> String {
        self.redirect_origin
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIRECT_ORIGIN.to_string())
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scopes
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()])
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn failure_redirect_delay(&self) -> Duration {
        Duration::from_millis(
            self.failure_redirect_delay_ms
                .unwrap_or(DEFAULT_FAILURE_REDIRECT_DELAY_MS),
        )
    }

    pub fn callback_wait(&self) -> Duration {
        Duration::from_secs(self.callback_wait_secs.unwrap_or(DEFAULT_CALLBACK_WAIT_SECS))
    }

    /// Build the storage backend the session store should use.
    pub fn session_persistence(&self) -> Result<Arc<dyn SessionPersistence>> {
        let persistence: Arc<dyn SessionPersistence> = match self.session_backend {
            SessionBackend::File => Arc::new(FileSessionPersistence::new(self.cache_dir()?)),
            SessionBackend::Keyring => Arc::new(
                KeyringSessionPersistence::new().context("Failed to open keychain entry")?,
            ),
            SessionBackend::Memory => Arc::new(MemorySessionPersistence::default()),
        };
        Ok(persistence)
    }
}
