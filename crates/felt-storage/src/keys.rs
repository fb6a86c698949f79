//! Storage key constants.

/// Storage keys used by the session runtime
pub struct StorageKeys;

impl StorageKeys {
    /// Redirect-intent marker: a redirect-based sign-in is in flight.
    /// Boolean-valued; always lives in the durable store so it survives
    /// the full page navigation the redirect flow causes.
    pub const REDIRECT_PENDING: &'static str = "redirect_pending";

    /// Cached session record (JSON)
    pub const CACHED_SESSION: &'static str = "cached_session";
}
