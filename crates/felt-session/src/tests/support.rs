//! Shared test support: a scriptable identity backend and startup helpers.
//!
//! `StubBackend` plays the hosted identity service. Each operation's
//! outcome is scripted up front; every call is recorded so tests can
//! assert on what the runtime did, in what order, and with the durable
//! marker in what state.

use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use felt_identity::{
    codes, AuthUser, BackendError, FederatedProvider, IdentityBackend, IdentityResult,
    SessionEvents,
};
use felt_storage::{create_storage, StateVault, StorageScope};
use tokio::sync::broadcast;

use crate::SessionContext;

pub const DESKTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ApplyPersistence(StorageScope),
    Restore,
    SignInPassword,
    SignUpPassword,
    Popup,
    /// Snapshot of the durable redirect marker at the moment the
    /// navigation was requested.
    BeginRedirect { marker_was_set: bool },
    TakeRedirectResult,
    SignOut,
    SendPasswordReset,
    ConfirmPasswordReset,
    SendVerification,
    ReloadUser,
}

pub struct StubBackend {
    events: broadcast::Sender<Option<AuthUser>>,
    calls: StdMutex<Vec<Call>>,
    /// What `restore` reports through the event stream. `None` keeps the
    /// stream silent, modeling a backend that never settles.
    pub restore_emits: StdMutex<Option<Option<AuthUser>>>,
    pub apply_outcome: StdMutex<IdentityResult<()>>,
    pub password_outcome: StdMutex<Option<IdentityResult<AuthUser>>>,
    pub signup_outcome: StdMutex<Option<IdentityResult<AuthUser>>>,
    pub popup_outcome: StdMutex<Option<IdentityResult<AuthUser>>>,
    pub redirect_outcome: StdMutex<IdentityResult<()>>,
    /// `None` scripts a check that never resolves.
    pub redirect_result: StdMutex<Option<IdentityResult<Option<AuthUser>>>>,
    pub signout_outcome: StdMutex<IdentityResult<()>>,
    pub verification_outcome: StdMutex<IdentityResult<()>>,
    /// When set, `begin_redirect` reads this vault for the marker.
    pub marker_watch: StdMutex<Option<StateVault>>,
}

impl StubBackend {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            events,
            calls: StdMutex::new(Vec::new()),
            restore_emits: StdMutex::new(Some(None)),
            apply_outcome: StdMutex::new(Ok(())),
            password_outcome: StdMutex::new(None),
            signup_outcome: StdMutex::new(None),
            popup_outcome: StdMutex::new(None),
            redirect_outcome: StdMutex::new(Ok(())),
            redirect_result: StdMutex::new(Some(Ok(None))),
            signout_outcome: StdMutex::new(Ok(())),
            verification_outcome: StdMutex::new(Ok(())),
            marker_watch: StdMutex::new(None),
        })
    }

    /// Push an ambient session event, as the service would after a change
    /// it observed on its own.
    pub fn emit(&self, user: Option<AuthUser>) {
        let _ = self.events.send(user);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, call: &Call) -> bool {
        self.calls().contains(call)
    }

    pub fn count_of(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityBackend for StubBackend {
    async fn apply_persistence(&self, scope: StorageScope) -> IdentityResult<()> {
        self.record(Call::ApplyPersistence(scope));
        self.apply_outcome.lock().unwrap().clone()
    }

    async fn restore(&self) -> IdentityResult<()> {
        self.record(Call::Restore);
        if let Some(user) = self.restore_emits.lock().unwrap().clone() {
            self.emit(user);
        }
        Ok(())
    }

    fn subscribe(&self) -> SessionEvents {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> IdentityResult<AuthUser> {
        self.record(Call::SignInPassword);
        let outcome = self
            .password_outcome
            .lock()
            .unwrap()
            .clone()
            .expect("password outcome not scripted");
        if let Ok(user) = &outcome {
            self.emit(Some(user.clone()));
        }
        outcome
    }

    async fn sign_up_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> IdentityResult<AuthUser> {
        self.record(Call::SignUpPassword);
        let outcome = self
            .signup_outcome
            .lock()
            .unwrap()
            .clone()
            .expect("signup outcome not scripted");
        if let Ok(user) = &outcome {
            self.emit(Some(user.clone()));
        }
        outcome
    }

    async fn sign_in_with_popup(&self, _provider: &FederatedProvider) -> IdentityResult<AuthUser> {
        self.record(Call::Popup);
        let outcome = self
            .popup_outcome
            .lock()
            .unwrap()
            .clone()
            .expect("popup outcome not scripted");
        if let Ok(user) = &outcome {
            self.emit(Some(user.clone()));
        }
        outcome
    }

    async fn begin_redirect(&self, _provider: &FederatedProvider) -> IdentityResult<()> {
        let marker_was_set = self
            .marker_watch
            .lock()
            .unwrap()
            .as_ref()
            .map(|vault| vault.redirect_pending().unwrap())
            .unwrap_or(false);
        self.record(Call::BeginRedirect { marker_was_set });
        self.redirect_outcome.lock().unwrap().clone()
    }

    async fn take_redirect_result(&self) -> IdentityResult<Option<AuthUser>> {
        self.record(Call::TakeRedirectResult);
        let scripted = self.redirect_result.lock().unwrap().clone();
        match scripted {
            Some(outcome) => {
                if let Ok(Some(user)) = &outcome {
                    self.emit(Some(user.clone()));
                }
                outcome
            }
            // Scripted to hang, like a check against a service that
            // never answers.
            None => std::future::pending().await,
        }
    }

    async fn sign_out(&self) -> IdentityResult<()> {
        self.record(Call::SignOut);
        let outcome = self.signout_outcome.lock().unwrap().clone();
        if outcome.is_ok() {
            self.emit(None);
        }
        outcome
    }

    async fn send_password_reset(&self, _email: &str) -> IdentityResult<()> {
        self.record(Call::SendPasswordReset);
        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        _token: &str,
        _new_password: &str,
    ) -> IdentityResult<()> {
        self.record(Call::ConfirmPasswordReset);
        Ok(())
    }

    async fn send_verification_email(&self) -> IdentityResult<()> {
        self.record(Call::SendVerification);
        self.verification_outcome.lock().unwrap().clone()
    }

    async fn reload_user(&self) -> IdentityResult<Option<AuthUser>> {
        self.record(Call::ReloadUser);
        Ok(None)
    }
}

pub fn user(id: &str) -> AuthUser {
    AuthUser {
        id: id.to_string(),
        email: Some(format!("{}@felt.im", id)),
        display_name: None,
        photo_url: None,
        email_verified: false,
    }
}

pub fn backend_error(code: &str) -> BackendError {
    BackendError::new(code, "scripted failure")
}

/// Vault over the same durable store the runtime uses for `dir`, for
/// seeding and probing the redirect marker from the outside.
pub fn open_vault(dir: &Path) -> StateVault {
    StateVault::new(create_storage(StorageScope::Durable, dir).expect("vault storage"))
}

/// Start a context over the stub, as one "page load" of the app.
pub async fn start_context(
    stub: &Arc<StubBackend>,
    dir: &Path,
    user_agent: &str,
) -> SessionContext {
    SessionContext::start_with_backend(stub.clone(), true, dir, user_agent)
        .await
        .expect("context start")
}

/// Poll until `cond` holds. The runtime settles through spawned tasks, so
/// observations need a grace period.
pub async fn wait_until(mut cond: impl FnMut() -> bool, what: &str) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// A sanity check on the codes the stub scripts with.
#[test]
fn scripted_codes_are_known() {
    for code in [
        codes::POPUP_BLOCKED,
        codes::POPUP_CLOSED_BY_USER,
        codes::PROVIDER_DISABLED,
        codes::ACCOUNT_CONFLICT,
        codes::USER_CANCELLED,
        codes::INVALID_CREDENTIALS,
        codes::UNAUTHORIZED_ORIGIN,
    ] {
        assert!(codes::ALL.contains(&code));
    }
}
