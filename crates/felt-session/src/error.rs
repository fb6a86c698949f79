//! User-facing error taxonomy for session operations.
//!
//! Backend failure codes are folded into this closed set by
//! [`crate::translate::classify`]. The `Display` text of each variant is
//! the message shown to the user, so it stays free of codes, URLs and
//! internal detail. [`AuthError::Unknown`] is the only variant that
//! carries raw diagnostics.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    IdentifierInUse,

    #[error("no account matches this email")]
    IdentifierNotFound,

    #[error("this password is too easy to guess; pick a longer one")]
    WeakSecret,

    #[error("this email address doesn't look right")]
    MalformedIdentifier,

    #[error("too many attempts; wait a moment and try again")]
    RateLimited,

    #[error("sign-in was cancelled")]
    Cancelled,

    #[error("the sign-in window was blocked before it could open")]
    PopupBlocked,

    #[error("couldn't reach the sign-in service; check your connection")]
    NetworkBlocked,

    #[error("sign-in isn't allowed from this copy of the app")]
    UnauthorizedOrigin,

    #[error("this way of signing in is currently switched off")]
    ProviderDisabled,

    #[error("this email is already linked to a different way of signing in")]
    AccountConflict,

    #[error("this link has expired; request a new one")]
    ExpiredToken,

    #[error("this link is invalid; request a new one")]
    InvalidToken,

    #[error("no one is signed in")]
    NoActiveSession,

    #[error("something went wrong while signing in ({0})")]
    Unknown(String),

    /// Local state could not be read or written.
    #[error("couldn't save sign-in state on this device ({0})")]
    Storage(String),

    /// A sign-in attempt was driven out of order. Always a bug in the
    /// caller, never a service condition.
    #[error("sign-in attempt got out of order ({0})")]
    InvalidStateTransition(String),
}

impl From<felt_storage::StorageError> for AuthError {
    fn from(err: felt_storage::StorageError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl From<felt_config::CoreError> for AuthError {
    fn from(err: felt_config::CoreError) -> Self {
        AuthError::Unknown(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
