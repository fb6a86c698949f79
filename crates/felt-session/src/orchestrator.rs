//! Drives sign-in operations against the backend.
//!
//! The orchestrator owns the popup-or-redirect decision for federated
//! sign-in and the redirect-intent marker that survives the app when a
//! redirect leaves it. Session state itself is the listener's; results
//! returned here are conveniences for the call site.

use std::sync::Arc;

use felt_identity::{codes, AuthUser, FederatedProvider, IdentityBackend};
use felt_storage::StateVault;
use tracing::{debug, info, warn};

use crate::environment::prefers_redirect;
use crate::error::{AuthError, AuthResult};
use crate::listener::SessionListener;
use crate::machine::{AttemptInput, AttemptMachine, AttemptState};
use crate::translate::classify;

/// Failure codes meaning the popup itself could not run. Only these fall
/// back to redirect; a decline at the provider (`user_cancelled`) is the
/// user's answer, not the popup's failure, and must not re-prompt.
const POPUP_REJECTIONS: &[&str] = &[
    codes::POPUP_BLOCKED,
    codes::POPUP_CLOSED_BY_USER,
    codes::POPUP_REQUEST_CANCELLED,
];

/// How a federated sign-in call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederatedSignIn {
    /// The flow finished in place and this user is signed in.
    Completed(AuthUser),
    /// The primary surface is being handed to the provider. There is no
    /// user yet; the result arrives through the listener on a later
    /// launch.
    RedirectStarted,
}

pub struct SignInOrchestrator {
    backend: Arc<dyn IdentityBackend>,
    listener: Arc<SessionListener>,
    marker: StateVault,
    user_agent: String,
}

impl SignInOrchestrator {
    pub fn new(
        backend: Arc<dyn IdentityBackend>,
        listener: Arc<SessionListener>,
        marker: StateVault,
        user_agent: String,
    ) -> Self {
        Self {
            backend,
            listener,
            marker,
            user_agent,
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthUser> {
        self.backend
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| classify(&e))
    }

    /// Create an account and sign it in. When requested, the verification
    /// email goes out in the background; a failure there is logged, not
    /// surfaced, since the account itself is fine.
    pub async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        send_verification: bool,
    ) -> AuthResult<AuthUser> {
        let user = self
            .backend
            .sign_up_with_password(email, password)
            .await
            .map_err(|e| classify(&e))?;

        if send_verification {
            let backend = Arc::clone(&self.backend);
            tokio::spawn(async move {
                if let Err(err) = backend.send_verification_email().await {
                    warn!(code = %err.code, "could not send the verification email");
                }
            });
        }

        Ok(user)
    }

    /// Federated sign-in, popup first where the environment supports it.
    ///
    /// A popup refused by the environment (blocked, or closed before it
    /// could finish) falls back to the redirect flow within the same
    /// attempt. Provider and account failures do not: retrying them over
    /// a redirect would fail identically.
    pub async fn sign_in_with_provider(
        &self,
        provider: &FederatedProvider,
        force_redirect: bool,
    ) -> AuthResult<FederatedSignIn> {
        let mut machine = AttemptMachine::new();
        self.advance(&mut machine, &AttemptInput::Begin)?;

        if force_redirect || prefers_redirect(&self.user_agent) {
            debug!(force_redirect, "taking the redirect flow");
            return self.start_redirect(&mut machine, provider).await;
        }

        self.advance(&mut machine, &AttemptInput::PickPopup)?;
        match self.backend.sign_in_with_popup(provider).await {
            Ok(user) => {
                self.advance(&mut machine, &AttemptInput::PopupDone)?;
                info!(user_id = %user.id, provider = provider.id(), "popup sign-in completed");
                Ok(FederatedSignIn::Completed(user))
            }
            Err(err) => {
                if POPUP_REJECTIONS.contains(&err.code.as_str()) {
                    info!(code = %err.code, "popup rejected; falling back to redirect");
                    self.advance(&mut machine, &AttemptInput::PopupRejected)?;
                    self.start_redirect(&mut machine, provider).await
                } else {
                    self.advance(&mut machine, &AttemptInput::PopupFailed)?;
                    // The popup path sets no marker; clear anyway so a
                    // stale one from an earlier attempt cannot linger.
                    if let Err(storage_err) = self.marker.clear_redirect_pending() {
                        warn!(error = %storage_err, "could not clear the redirect marker");
                    }
                    Err(classify(&err))
                }
            }
        }
    }

    async fn start_redirect(
        &self,
        machine: &mut AttemptMachine,
        provider: &FederatedProvider,
    ) -> AuthResult<FederatedSignIn> {
        self.advance(machine, &AttemptInput::PickRedirect)?;

        // Marker before navigation: if the app never comes back, the next
        // launch must know a redirect was in flight. If the marker cannot
        // be written, do not navigate at all.
        self.marker.mark_redirect_pending()?;

        match self.backend.begin_redirect(provider).await {
            Ok(()) => {
                info!(provider = provider.id(), "redirect sign-in started");
                Ok(FederatedSignIn::RedirectStarted)
            }
            Err(err) => {
                // Navigation never happened; nothing is pending.
                if let Err(storage_err) = self.marker.clear_redirect_pending() {
                    warn!(error = %storage_err, "could not clear the redirect marker");
                }
                Err(classify(&err))
            }
        }
    }

    /// Sign out. The redirect marker goes first: signing out aborts any
    /// half-finished redirect regardless of how the backend call goes.
    pub async fn sign_out(&self) -> AuthResult<()> {
        if let Err(err) = self.marker.clear_redirect_pending() {
            warn!(error = %err, "could not clear the redirect marker");
        }
        self.backend.sign_out().await.map_err(|e| classify(&e))
    }

    pub async fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        self.backend
            .send_password_reset(email)
            .await
            .map_err(|e| classify(&e))
    }

    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        self.backend
            .confirm_password_reset(token, new_password)
            .await
            .map_err(|e| classify(&e))
    }

    /// Re-send the address-verification email for the signed-in user.
    pub async fn send_verification_email(&self) -> AuthResult<()> {
        if self.listener.current_user().is_none() {
            return Err(AuthError::NoActiveSession);
        }
        self.backend
            .send_verification_email()
            .await
            .map_err(|e| classify(&e))
    }

    /// Re-fetch the signed-in user's profile from the service.
    pub async fn reload_profile(&self) -> AuthResult<Option<AuthUser>> {
        self.backend.reload_user().await.map_err(|e| classify(&e))
    }

    fn advance(&self, machine: &mut AttemptMachine, input: &AttemptInput) -> AuthResult<()> {
        machine.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "input {:?} rejected in state {:?}",
                input,
                machine.state()
            ))
        })?;
        debug!(state = ?AttemptState::from(machine.state()), "sign-in attempt advanced");
        Ok(())
    }
}
