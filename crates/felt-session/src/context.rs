//! The app-facing handle to the session runtime.

use std::path::PathBuf;
use std::sync::Arc;

use felt_config::{Config, Paths};
use felt_identity::{
    AuthUser, FederatedProvider, HttpIdentityBackend, IdentityBackend, SystemBrowserFlows,
};
use felt_storage::{create_storage, StateVault, StorageScope};
use tokio::sync::broadcast;
use tracing::info;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::gate::PersistenceGate;
use crate::listener::{SessionChanged, SessionListener};
use crate::orchestrator::{FederatedSignIn, SignInOrchestrator};

/// Point-in-time view of the session, safe to render from.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub current_user: Option<AuthUser>,
    /// True while the session state is still being established. Render a
    /// splash, not a sign-in form: the form would flash at every signed-in
    /// user, and swallow the tail end of every redirect sign-in.
    pub is_loading: bool,
}

/// Owns the wired-up session runtime and exposes everything the UI layer
/// needs: the current user, the loading flag, a change stream, and the
/// sign-in operations.
///
/// Cheap to clone; clones share one runtime.
#[derive(Clone)]
pub struct SessionContext {
    listener: Arc<SessionListener>,
    orchestrator: Arc<SignInOrchestrator>,
}

impl SessionContext {
    /// Wire the runtime against the hosted identity service and start it.
    ///
    /// `launch_url` is the URL this process was opened with, so a
    /// redirect reply riding on it gets consumed; `user_agent` describes
    /// the host surface and picks the federated flow — pass the embedding
    /// webview's UA string, or an empty string for a plain desktop shell.
    pub async fn start(
        config: &Config,
        paths: &Paths,
        launch_url: Option<Url>,
        user_agent: &str,
    ) -> AuthResult<Self> {
        paths.ensure_dirs()?;
        let flows = flows_from_config(config, launch_url);
        let backend: Arc<dyn IdentityBackend> = Arc::new(HttpIdentityBackend::new(
            config.identity_url.as_str(),
            config.publishable_key.as_str(),
            paths.state_dir(),
            Arc::new(flows),
        ));
        Self::start_with_backend(
            backend,
            config.remember_sessions,
            paths.state_dir(),
            user_agent,
        )
        .await
    }

    /// Wire the runtime over an already-built backend.
    ///
    /// Startup order is load-bearing: durability gate, then the listener
    /// (which replays the stored session), then the pending-redirect
    /// check. The marker store is durable no matter what
    /// `remember_sessions` says, so a redirect can be reconciled even
    /// when sessions themselves are scoped to one run.
    pub async fn start_with_backend(
        backend: Arc<dyn IdentityBackend>,
        remember_sessions: bool,
        state_dir: impl Into<PathBuf>,
        user_agent: &str,
    ) -> AuthResult<Self> {
        let scope = if remember_sessions {
            StorageScope::Durable
        } else {
            StorageScope::SessionOnly
        };
        let state_dir = state_dir.into();
        let marker = StateVault::new(create_storage(StorageScope::Durable, &state_dir)?);

        let gate = Arc::new(PersistenceGate::new(Arc::clone(&backend), scope));
        let listener = SessionListener::new(Arc::clone(&backend), gate, marker.clone());
        listener.attach().await;

        let orchestrator = Arc::new(SignInOrchestrator::new(
            backend,
            Arc::clone(&listener),
            marker,
            user_agent.to_string(),
        ));

        info!(remember_sessions, "session runtime started");
        Ok(Self {
            listener,
            orchestrator,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_user: self.listener.current_user(),
            is_loading: self.listener.is_loading(),
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.listener.current_user()
    }

    pub fn is_loading(&self) -> bool {
        self.listener.is_loading()
    }

    /// Stream of session changes; each carries the user and the loading
    /// flag as of that change.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChanged> {
        self.listener.subscribe()
    }

    /// The failure from a redirect sign-in that ended on a previous
    /// launch, if one is waiting. Consuming it is the UI's job; it is
    /// reported once.
    pub fn take_flow_error(&self) -> Option<AuthError> {
        self.listener.take_flow_error()
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthUser> {
        self.orchestrator.sign_in_with_password(email, password).await
    }

    pub async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        send_verification: bool,
    ) -> AuthResult<AuthUser> {
        self.orchestrator
            .sign_up_with_password(email, password, send_verification)
            .await
    }

    /// Federated sign-in. `force_redirect` skips the popup flow outright;
    /// otherwise the environment decides.
    pub async fn sign_in_with_provider(
        &self,
        provider: &FederatedProvider,
        force_redirect: bool,
    ) -> AuthResult<FederatedSignIn> {
        self.orchestrator
            .sign_in_with_provider(provider, force_redirect)
            .await
    }

    pub async fn sign_out(&self) -> AuthResult<()> {
        self.orchestrator.sign_out().await
    }

    pub async fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        self.orchestrator.send_password_reset(email).await
    }

    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        self.orchestrator
            .confirm_password_reset(token, new_password)
            .await
    }

    pub async fn send_verification_email(&self) -> AuthResult<()> {
        self.orchestrator.send_verification_email().await
    }

    pub async fn reload_profile(&self) -> AuthResult<Option<AuthUser>> {
        self.orchestrator.reload_profile().await
    }
}

/// Build the system-browser flow driver from the config: the loopback
/// callback pinned to the configured port when one is set, and the
/// launch URL recorded for the pending-redirect check.
fn flows_from_config(config: &Config, launch_url: Option<Url>) -> SystemBrowserFlows {
    let mut flows = SystemBrowserFlows::new();
    if let Some(port) = config.callback_port {
        flows = flows.with_callback_port(port);
    }
    if let Some(url) = launch_url {
        flows.record_launch_url(url);
    }
    flows
}
