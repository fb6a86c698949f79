//! One-shot barrier that applies session durability before first use.

use std::sync::Arc;

use felt_identity::IdentityBackend;
use felt_storage::StorageScope;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Applies the configured durability scope to the backend exactly once,
/// before the first operation that could touch the session cache.
///
/// Every sign-in path awaits [`PersistenceGate::ready`]; until it
/// resolves, the session state is still loading.
pub struct PersistenceGate {
    backend: Arc<dyn IdentityBackend>,
    scope: StorageScope,
    applied: OnceCell<()>,
}

impl PersistenceGate {
    pub fn new(backend: Arc<dyn IdentityBackend>, scope: StorageScope) -> Self {
        Self {
            backend,
            scope,
            applied: OnceCell::new(),
        }
    }

    /// Resolve the gate, applying the durability scope on first call.
    ///
    /// Concurrent callers coalesce on one application; later calls return
    /// immediately. A failed application is logged and the gate resolves
    /// anyway: degraded durability must not wedge sign-in.
    pub async fn ready(&self) {
        self.applied
            .get_or_init(|| async {
                match self.backend.apply_persistence(self.scope).await {
                    Ok(()) => debug!(scope = ?self.scope, "session durability applied"),
                    Err(err) => warn!(
                        code = %err.code,
                        "session durability not applied; backend keeps its default"
                    ),
                }
            })
            .await;
    }

    /// Whether the one-time application has happened, successfully or not.
    pub fn is_resolved(&self) -> bool {
        self.applied.initialized()
    }
}
