//! Core configuration and utilities for the Felt client runtime.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_IDENTITY_URL, DEFAULT_LOG_LEVEL, DEFAULT_PUBLISHABLE_KEY};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
