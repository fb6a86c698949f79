//! Failure codes emitted by the identity service.
//!
//! The service reports failures as short machine-readable codes. This is
//! the closed set the client understands; anything else is carried through
//! verbatim and surfaced as an unrecognized failure.

pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
pub const EMAIL_EXISTS: &str = "email_exists";
pub const USER_NOT_FOUND: &str = "user_not_found";
pub const WEAK_PASSWORD: &str = "weak_password";
pub const VALIDATION_FAILED: &str = "validation_failed";
pub const OVER_REQUEST_RATE_LIMIT: &str = "over_request_rate_limit";
pub const USER_CANCELLED: &str = "user_cancelled";
pub const POPUP_BLOCKED: &str = "popup_blocked";
pub const POPUP_CLOSED_BY_USER: &str = "popup_closed_by_user";
pub const POPUP_REQUEST_CANCELLED: &str = "popup_request_cancelled";
pub const NETWORK_REQUEST_FAILED: &str = "network_request_failed";
pub const UNAUTHORIZED_ORIGIN: &str = "unauthorized_origin";
pub const PROVIDER_DISABLED: &str = "provider_disabled";
pub const ACCOUNT_CONFLICT: &str = "account_conflict";
pub const RESET_TOKEN_EXPIRED: &str = "reset_token_expired";
pub const RESET_TOKEN_INVALID: &str = "reset_token_invalid";
pub const SESSION_MISSING: &str = "session_missing";

/// Every code the service is known to emit.
pub const ALL: &[&str] = &[
    INVALID_CREDENTIALS,
    EMAIL_EXISTS,
    USER_NOT_FOUND,
    WEAK_PASSWORD,
    VALIDATION_FAILED,
    OVER_REQUEST_RATE_LIMIT,
    USER_CANCELLED,
    POPUP_BLOCKED,
    POPUP_CLOSED_BY_USER,
    POPUP_REQUEST_CANCELLED,
    NETWORK_REQUEST_FAILED,
    UNAUTHORIZED_ORIGIN,
    PROVIDER_DISABLED,
    ACCOUNT_CONFLICT,
    RESET_TOKEN_EXPIRED,
    RESET_TOKEN_INVALID,
    SESSION_MISSING,
];
