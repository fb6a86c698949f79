//! The identity backend contract.

use async_trait::async_trait;
use felt_storage::StorageScope;
use tokio::sync::broadcast;

use crate::error::IdentityResult;
use crate::types::{AuthUser, FederatedProvider};

/// Stream of session-change events. Each payload is the current user,
/// or `None` when signed out.
pub type SessionEvents = broadcast::Receiver<Option<AuthUser>>;

/// Everything the session runtime needs from an identity service.
///
/// The HTTP implementation is [`crate::HttpIdentityBackend`]; tests swap
/// in scripted fakes. Implementations own the session record (tokens and
/// profile) and broadcast every observed change through [`Self::subscribe`].
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Apply the durability scope for the cached session before any other
    /// operation touches it.
    async fn apply_persistence(&self, scope: StorageScope) -> IdentityResult<()>;

    /// Load the cached session, refresh it if stale, and emit exactly one
    /// session-change event reflecting the outcome.
    async fn restore(&self) -> IdentityResult<()>;

    /// Subscribe to session-change events.
    fn subscribe(&self) -> SessionEvents;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> IdentityResult<AuthUser>;

    async fn sign_up_with_password(&self, email: &str, password: &str)
        -> IdentityResult<AuthUser>;

    /// Run the interactive federated flow without leaving the app.
    async fn sign_in_with_popup(&self, provider: &FederatedProvider) -> IdentityResult<AuthUser>;

    /// Hand the whole surface over to the provider. On success the app is
    /// navigating away; the result arrives on a later launch via
    /// [`Self::take_redirect_result`].
    async fn begin_redirect(&self, provider: &FederatedProvider) -> IdentityResult<()>;

    /// Consume the pending federated result from a previous redirect, if
    /// one arrived with this launch.
    ///
    /// `Ok(None)` means this launch did not come back from a provider.
    async fn take_redirect_result(&self) -> IdentityResult<Option<AuthUser>>;

    /// Drop the session locally and revoke it with the service.
    async fn sign_out(&self) -> IdentityResult<()>;

    async fn send_password_reset(&self, email: &str) -> IdentityResult<()>;

    /// Redeem a reset token and set a new password. Does not sign in.
    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> IdentityResult<()>;

    /// Ask the service to re-send the address-verification email for the
    /// current session.
    async fn send_verification_email(&self) -> IdentityResult<()>;

    /// Re-fetch the current user's profile from the service.
    ///
    /// `Ok(None)` when no session is active.
    async fn reload_user(&self) -> IdentityResult<Option<AuthUser>>;
}
