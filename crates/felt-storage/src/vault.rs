//! High-level API for the session runtime's persisted state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DurableStorage, StorageError, StorageKeys, StorageResult};

/// Cached session record, as persisted between page loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Identity handle issued by the backend
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    /// When the access token expires (ISO timestamp)
    pub expires_at: String,
}

impl CachedSession {
    /// Whether the access token has expired. An unparseable timestamp is
    /// treated as expired so the record gets refreshed rather than trusted.
    pub fn is_expired(&self) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires) => expires <= chrono::Utc::now(),
            Err(_) => true,
        }
    }
}

/// Typed facade over a storage backend.
///
/// Two instances exist at runtime: one over the always-durable file store
/// for the redirect-intent marker, and one inside the identity backend for
/// the session cache, whose backing store follows the configured
/// durability mode.
#[derive(Clone)]
pub struct StateVault {
    storage: Arc<dyn DurableStorage>,
}

impl StateVault {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Redirect-intent marker
    // ==========================================

    /// Record that a redirect-based sign-in is in flight.
    pub fn mark_redirect_pending(&self) -> StorageResult<()> {
        debug!("redirect marker set");
        self.storage.set(StorageKeys::REDIRECT_PENDING, "true")
    }

    /// Remove the marker. Idempotent: clearing an absent marker is a no-op.
    pub fn clear_redirect_pending(&self) -> StorageResult<()> {
        if self.storage.delete(StorageKeys::REDIRECT_PENDING)? {
            debug!("redirect marker cleared");
        }
        Ok(())
    }

    /// Whether a redirect-based sign-in is recorded as in flight.
    pub fn redirect_pending(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::REDIRECT_PENDING)
    }

    // ==========================================
    // Cached session
    // ==========================================

    pub fn store_session(&self, session: &CachedSession) -> StorageResult<()> {
        let raw = serde_json::to_string(session)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::CACHED_SESSION, &raw)
    }

    pub fn load_session(&self) -> StorageResult<Option<CachedSession>> {
        match self.storage.get(StorageKeys::CACHED_SESSION)? {
            Some(raw) => {
                let session = serde_json::from_str(&raw)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    pub fn clear_session(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::CACHED_SESSION)?;
        Ok(())
    }

    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::CACHED_SESSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn vault() -> StateVault {
        StateVault::new(Arc::new(MemoryStorage::new()))
    }

    fn sample_session(expires_at: String) -> CachedSession {
        CachedSession {
            access_token: "access-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            user_id: "user-123".to_string(),
            email: Some("test@example.com".to_string()),
            display_name: Some("Test User".to_string()),
            photo_url: None,
            email_verified: false,
            expires_at,
        }
    }

    #[test]
    fn marker_set_read_clear() {
        let vault = vault();

        assert!(!vault.redirect_pending().unwrap());
        vault.mark_redirect_pending().unwrap();
        assert!(vault.redirect_pending().unwrap());

        vault.clear_redirect_pending().unwrap();
        assert!(!vault.redirect_pending().unwrap());
    }

    #[test]
    fn marker_clear_is_idempotent() {
        let vault = vault();
        vault.mark_redirect_pending().unwrap();

        vault.clear_redirect_pending().unwrap();
        vault.clear_redirect_pending().unwrap();
        assert!(!vault.redirect_pending().unwrap());
    }

    #[test]
    fn session_round_trip() {
        let vault = vault();
        assert!(!vault.has_session().unwrap());

        let future = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
        vault.store_session(&sample_session(future)).unwrap();
        assert!(vault.has_session().unwrap());

        let loaded = vault.load_session().unwrap().unwrap();
        assert_eq!(loaded.user_id, "user-123");
        assert_eq!(loaded.email.as_deref(), Some("test@example.com"));
        assert!(!loaded.is_expired());

        vault.clear_session().unwrap();
        assert!(vault.load_session().unwrap().is_none());
    }

    #[test]
    fn expired_and_unparseable_timestamps() {
        let past = (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
        assert!(sample_session(past).is_expired());

        assert!(sample_session("garbage".to_string()).is_expired());
    }

    #[test]
    fn marker_and_session_do_not_collide() {
        let vault = vault();
        let future = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
        vault.mark_redirect_pending().unwrap();
        vault.store_session(&sample_session(future)).unwrap();

        vault.clear_session().unwrap();
        assert!(vault.redirect_pending().unwrap());

        vault.clear_redirect_pending().unwrap();
        assert!(vault.load_session().unwrap().is_none());
    }
}
