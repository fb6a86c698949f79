//! Durable state storage for the Felt client session runtime.
//!
//! This crate provides the key/value layer everything session-related
//! persists through:
//! - **[`FileStorage`]**: a JSON-backed store that survives page reloads
//!   and process restarts
//! - **[`MemoryStorage`]**: a session-scoped store that deliberately does
//!   not survive them
//! - **[`StateVault`]**: a typed facade for the redirect-intent marker and
//!   the cached session record

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::DurableStorage;
pub use vault::{CachedSession, StateVault};

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

/// File name of the durable store within the state directory.
pub const STATE_FILE: &str = "client-state.json";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// How long persisted session state must outlive the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    /// Survives reloads and restarts
    Durable,
    /// Discarded with the current page instance
    SessionOnly,
}

/// Create the storage backend for the given durability scope.
///
/// `state_dir` is only consulted for the durable scope; session-only
/// storage never touches disk.
pub fn create_storage(
    scope: StorageScope,
    state_dir: &Path,
) -> StorageResult<Arc<dyn DurableStorage>> {
    match scope {
        StorageScope::Durable => {
            let storage = FileStorage::open(state_dir.join(STATE_FILE))?;
            Ok(Arc::new(storage))
        }
        StorageScope::SessionOnly => Ok(Arc::new(MemoryStorage::new())),
    }
}
