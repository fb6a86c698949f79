//! File system paths for the client runtime.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Manages file system paths for the client runtime.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.felt)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.felt`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".felt"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.felt).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.felt/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the durable state directory (~/.felt/state).
    ///
    /// The session runtime's persisted key/value store lives here.
    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join("state")
    }

    /// Get the logs directory (~/.felt/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.state_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new().expect("Failed to determine home directory")
    }
}
