//! Configuration management for the client runtime.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default identity service URL (can be overridden at compile time via the
/// FELT_IDENTITY_URL env var).
pub const DEFAULT_IDENTITY_URL: &str = match option_env!("FELT_IDENTITY_URL") {
    Some(url) => url,
    None => "https://id.felt.im",
};

/// Default publishable API key (can be overridden at compile time via the
/// FELT_PUBLISHABLE_KEY env var).
pub const DEFAULT_PUBLISHABLE_KEY: &str = match option_env!("FELT_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "felt-pk-dev",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Identity service URL.
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    /// Publishable API key (public, safe to expose).
    #[serde(default = "default_publishable_key")]
    pub publishable_key: String,
    /// Whether sessions survive restarts (durable storage) or are scoped
    /// to the current page instance. Applied once, by the persistence
    /// gate, before the identity backend is first queried.
    #[serde(default = "default_remember_sessions")]
    pub remember_sessions: bool,
    /// Fixed loopback port for federated sign-in callbacks. None picks an
    /// ephemeral port.
    #[serde(default)]
    pub callback_port: Option<u16>,
}

fn default_identity_url() -> String {
    DEFAULT_IDENTITY_URL.to_string()
}

fn default_publishable_key() -> String {
    DEFAULT_PUBLISHABLE_KEY.to_string()
}

fn default_remember_sessions() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            publishable_key: DEFAULT_PUBLISHABLE_KEY.to_string(),
            remember_sessions: true,
            callback_port: None,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from a file, falling back to defaults.
    /// Note: identity_url and publishable_key are compile-time only and
    /// will always use the built-in defaults, regardless of what's in the
    /// config file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        // Force compile-time values (never from config file)
        config.identity_url = DEFAULT_IDENTITY_URL.to_string();
        config.publishable_key = DEFAULT_PUBLISHABLE_KEY.to_string();

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    /// Note: identity_url and publishable_key are compile-time only (set
    /// via env vars during build). Only log_level and remember_sessions
    /// can be overridden at runtime.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("FELT_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(remember) = std::env::var("FELT_REMEMBER_SESSIONS") {
            match remember.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.remember_sessions = true,
                "0" | "false" | "no" => self.remember_sessions = false,
                _ => {}
            }
        }
    }

    /// Get the identity service URL as a parsed URL.
    pub fn identity_url(&self) -> CoreResult<Url> {
        Url::parse(&self.identity_url).map_err(CoreError::from)
    }
}
