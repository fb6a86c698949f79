//! Folds backend failure codes into the [`AuthError`] taxonomy.

use felt_identity::{codes, BackendError};

use crate::error::AuthError;

/// Code-to-taxonomy table. Data, not logic: adding a recognized code is a
/// one-line change here and nowhere else.
static TABLE: &[(&str, AuthError)] = &[
    (codes::INVALID_CREDENTIALS, AuthError::InvalidCredentials),
    (codes::EMAIL_EXISTS, AuthError::IdentifierInUse),
    (codes::USER_NOT_FOUND, AuthError::IdentifierNotFound),
    (codes::WEAK_PASSWORD, AuthError::WeakSecret),
    (codes::VALIDATION_FAILED, AuthError::MalformedIdentifier),
    (codes::OVER_REQUEST_RATE_LIMIT, AuthError::RateLimited),
    (codes::USER_CANCELLED, AuthError::Cancelled),
    (codes::POPUP_BLOCKED, AuthError::PopupBlocked),
    (codes::POPUP_CLOSED_BY_USER, AuthError::Cancelled),
    (codes::POPUP_REQUEST_CANCELLED, AuthError::Cancelled),
    (codes::NETWORK_REQUEST_FAILED, AuthError::NetworkBlocked),
    (codes::UNAUTHORIZED_ORIGIN, AuthError::UnauthorizedOrigin),
    (codes::PROVIDER_DISABLED, AuthError::ProviderDisabled),
    (codes::ACCOUNT_CONFLICT, AuthError::AccountConflict),
    (codes::RESET_TOKEN_EXPIRED, AuthError::ExpiredToken),
    (codes::RESET_TOKEN_INVALID, AuthError::InvalidToken),
    (codes::SESSION_MISSING, AuthError::NoActiveSession),
];

/// Translate a backend failure into its user-facing category.
///
/// Unrecognized codes become [`AuthError::Unknown`] with the original
/// code and message preserved for diagnostics.
pub fn classify(err: &BackendError) -> AuthError {
    for (code, translated) in TABLE {
        if err.is_code(code) {
            return translated.clone();
        }
    }
    AuthError::Unknown(err.to_string())
}
