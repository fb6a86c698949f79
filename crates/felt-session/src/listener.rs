//! Observes the backend's session stream and owns the client's view of
//! "who is signed in".
//!
//! The listener is the single authority over session state. Sign-in
//! operations never set the current user themselves; they wait for their
//! effect to arrive through the stream like any other change. It also
//! owns the pending-redirect check at startup, so a sign-in that left the
//! app through a redirect gets exactly one reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use felt_identity::{AuthUser, IdentityBackend};
use felt_storage::StateVault;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::gate::PersistenceGate;
use crate::translate::classify;

const WATCHER_CAPACITY: usize = 32;

/// Snapshot pushed to watchers on every observed session change.
#[derive(Debug, Clone)]
pub struct SessionChanged {
    pub user: Option<AuthUser>,
    pub loading: bool,
}

pub struct SessionListener {
    backend: Arc<dyn IdentityBackend>,
    gate: Arc<PersistenceGate>,
    /// Redirect-intent marker; always durable regardless of session scope.
    marker: StateVault,
    current: StdMutex<Option<AuthUser>>,
    /// Set once the first session event has been observed.
    settled: AtomicBool,
    /// Failure from the startup redirect check, parked until the UI asks.
    flow_error: StdMutex<Option<AuthError>>,
    watchers: broadcast::Sender<SessionChanged>,
}

impl SessionListener {
    pub fn new(
        backend: Arc<dyn IdentityBackend>,
        gate: Arc<PersistenceGate>,
        marker: StateVault,
    ) -> Arc<Self> {
        let (watchers, _) = broadcast::channel(WATCHER_CAPACITY);
        Arc::new(Self {
            backend,
            gate,
            marker,
            current: StdMutex::new(None),
            settled: AtomicBool::new(false),
            flow_error: StdMutex::new(None),
            watchers,
        })
    }

    /// Start observing. Ordered so nothing races the stored session:
    /// durability is applied first, the event pump subscribes before the
    /// backend replays its restored state, and only then is a pending
    /// redirect result consumed.
    pub async fn attach(self: &Arc<Self>) {
        self.gate.ready().await;

        let mut events = self.backend.subscribe();
        let listener = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(user) => listener.observe(user),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Err(err) = self.backend.restore().await {
            // The backend contract says restore always reports through the
            // stream; if it errored out instead, settle as signed out so
            // the app does not load forever.
            warn!(code = %err.code, "session restore failed");
            self.observe(None);
        }

        let listener = Arc::clone(self);
        tokio::spawn(async move {
            listener.check_redirect_result().await;
        });
    }

    /// Fold one observed session change into local state.
    ///
    /// The marker is cleared before watchers recompute their loading
    /// state: a redirect is no longer "in flight" once any authoritative
    /// session report has arrived, including the no-result report after
    /// an abandoned redirect. Clearing an absent marker is a no-op.
    fn observe(&self, user: Option<AuthUser>) {
        if let Err(err) = self.marker.clear_redirect_pending() {
            warn!(error = %err, "could not clear the redirect marker");
        }

        {
            let mut current = self.current.lock().expect("lock poisoned");
            *current = user.clone();
        }
        if !self.settled.swap(true, Ordering::SeqCst) {
            debug!("session listener settled");
        }

        info!(signed_in = user.is_some(), "session changed");
        let _ = self.watchers.send(SessionChanged {
            user,
            loading: self.is_loading(),
        });
    }

    /// Consume the redirect result delivered with this launch, if any.
    ///
    /// Success needs no handling here: the completed sign-in flows
    /// through the event pump like every other change. Failure must clear
    /// the marker itself, because no session event is coming to do it.
    async fn check_redirect_result(&self) {
        match self.backend.take_redirect_result().await {
            Ok(Some(user)) => {
                info!(user_id = %user.id, "redirect sign-in completed");
            }
            Ok(None) => {
                debug!("no pending redirect result");
            }
            Err(err) => {
                warn!(code = %err.code, "redirect sign-in failed");
                if let Err(storage_err) = self.marker.clear_redirect_pending() {
                    warn!(error = %storage_err, "could not clear the redirect marker");
                }
                {
                    let mut parked = self.flow_error.lock().expect("lock poisoned");
                    *parked = Some(classify(&err));
                }
                self.emit_snapshot();
            }
        }
    }

    /// Whether the session state is still being established.
    ///
    /// True until durability is applied, the first session event has
    /// arrived, and no redirect reconciliation is pending. A marker that
    /// cannot be read counts as absent; a broken store must not pin the
    /// app in its loading state.
    pub fn is_loading(&self) -> bool {
        if !self.gate.is_resolved() {
            return true;
        }
        if !self.settled.load(Ordering::SeqCst) {
            return true;
        }
        self.marker.redirect_pending().unwrap_or(false)
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.current.lock().expect("lock poisoned").clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionChanged> {
        self.watchers.subscribe()
    }

    /// Hand over the parked redirect failure, if one is waiting.
    pub fn take_flow_error(&self) -> Option<AuthError> {
        self.flow_error.lock().expect("lock poisoned").take()
    }

    fn emit_snapshot(&self) {
        let user = self.current.lock().expect("lock poisoned").clone();
        let _ = self.watchers.send(SessionChanged {
            user,
            loading: self.is_loading(),
        });
    }
}
