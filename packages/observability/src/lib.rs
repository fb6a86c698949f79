//! # Observability
//!
//! Centralized observability layer for the Felt client monorepo.
//!
//! ## Design Philosophy
//!
//! Components are **log producers**, not log consumers or streamers. They
//! call `observability::init()` once at startup and use standard `tracing`
//! macros throughout their code. They have zero knowledge of:
//!
//! - Where logs go (file, stderr)
//! - Who consumes logs (CLI tools, dashboards, aggregators)
//! - How logs are streamed (pull via tail, push via network)
//!
//! ## Dev Mode
//!
//! All components write structured JSONL to a single central file:
//! `~/.felt/logs/dev.jsonl`
//!
//! This enables:
//! - `tail -f ~/.felt/logs/dev.jsonl` for raw streaming
//! - `tail -f ~/.felt/logs/dev.jsonl | jq` for pretty JSON
//! - `lnav ~/.felt/logs/dev.jsonl` for interactive exploration
//!
//! Multi-process safety is achieved through append-only writes with
//! per-line flush semantics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init("client");
//!
//!     tracing::info!("session runtime started");
//!     // ... rest of your code
//! }
//! ```
//!
//! Or with configuration:
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "client".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//! }
//! ```

#[cfg(feature = "dev")]
mod dev;

mod json_layer;

#[cfg(feature = "dev")]
pub use dev::{CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

use std::path::PathBuf;

/// Environment variable consulted for the log level filter.
pub const LOG_FILTER_ENV: &str = "FELT_LOG";

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the component (e.g., "client", "session", "worker").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by the `FELT_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.felt/logs/dev.jsonl` in dev mode.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    /// Defaults to false in dev mode.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize the observability layer with default settings.
///
/// This is the zero-config entry point. Components call this once at
/// startup:
///
/// ```rust,ignore
/// fn main() {
///     observability::init("my-component");
///     tracing::info!("ready");
/// }
/// ```
///
/// # Panics
///
/// Panics if the log file cannot be created or opened.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the observability layer with custom configuration.
///
/// Use this when you need to customize logging behavior:
///
/// ```rust,ignore
/// observability::init_with_config(observability::LogConfig {
///     service_name: "client".into(),
///     default_level: "debug".into(),
///     also_stderr: true,
///     ..Default::default()
/// });
/// ```
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    {
        dev::init_dev_subscriber(&config);
    }

    #[cfg(not(feature = "dev"))]
    {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(&config.default_level))
            .with_target(true)
            .compact()
            .init();
    }
}

/// Build the level filter: `FELT_LOG` wins, the configured default
/// otherwise.
pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
/// Components can use `observability::info!()` or `tracing::info!()`.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export the span macro for structured context.
pub use tracing::span;

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }
}
