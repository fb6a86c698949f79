//! Logging initialization for the client runtime.
//!
//! This module re-exports the observability crate's initialization
//! functions. All client components use a centralized logging system that
//! writes structured JSONL to `~/.felt/logs/dev.jsonl`.

// Re-exports for direct access if needed
#[allow(unused_imports)]
pub use observability::{init, init_with_config, LogConfig};

use std::path::PathBuf;

/// Initialize the logging system for the client runtime.
///
/// This sets up tracing with:
/// - Structured JSONL output to `~/.felt/logs/dev.jsonl`
/// - Log level from the FELT_LOG env var or the provided default
/// - Service name included in every log line
///
/// # Arguments
///
/// * `level` - Default log level (trace, debug, info, warn, error)
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Session runtime started");
/// ```
pub fn init_logging(level: &str) {
    init_logging_for_service("client", level);
}

/// Initialize logging with a custom service name.
///
/// Use this when you need to distinguish between different client
/// components in the central log stream.
pub fn init_logging_for_service(service_name: &str, level: &str) {
    let log_path = std::env::var("FELT_OBS_DIR")
        .ok()
        .and_then(non_empty_env)
        .map(|dir| PathBuf::from(dir).join("dev.jsonl"));

    let also_stderr = std::env::var("FELT_OBS_STDERR")
        .ok()
        .and_then(non_empty_env)
        .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        // Show logs on stderr for foreground use
        .unwrap_or(true);

    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path,
        also_stderr,
    });
}

fn non_empty_env(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a log level string into a tracing Level.
#[allow(dead_code)]
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
