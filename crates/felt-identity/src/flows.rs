//! Interactive flow plumbing shared by popup and redirect sign-in.

use async_trait::async_trait;
use url::Url;

use crate::error::IdentityResult;

/// An authorization round-trip about to be handed to the user's browser.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    /// Fully-built authorize URL, including provider, scopes and state
    pub url: Url,
    /// Nonce echoed back by the service; popup replies must match it
    pub state: String,
}

/// What came back from the provider, in either flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackReply {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackReply {
    /// Build a reply from decoded key/value pairs, ignoring keys we do not
    /// recognize.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut reply = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "access_token" => reply.access_token = Some(value),
                "refresh_token" => reply.refresh_token = Some(value),
                "expires_in" => reply.expires_in = value.parse().ok(),
                "state" => reply.state = Some(value),
                "error" => reply.error = Some(value),
                "error_description" => reply.error_description = Some(value),
                _ => {}
            }
        }
        reply
    }

    /// Whether this reply carries anything worth acting on.
    pub fn is_meaningful(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some() || self.error.is_some()
    }
}

/// How interactive sign-in reaches the user.
///
/// The backend decides *what* to authorize; the driver decides *how* the
/// browser round-trip happens. [`crate::SystemBrowserFlows`] is the real
/// driver; tests script their own.
#[async_trait]
pub trait FlowDriver: Send + Sync {
    /// Run the flow in a secondary surface and wait for the reply. The
    /// app keeps running throughout.
    async fn run_popup(&self, request: &AuthorizeRequest) -> IdentityResult<CallbackReply>;

    /// Hand the primary surface to the provider. Returns once the
    /// hand-off has started; the reply arrives on a later launch.
    async fn begin_redirect(&self, request: &AuthorizeRequest) -> IdentityResult<()>;

    /// The reply delivered with this launch, if any.
    async fn take_redirect_reply(&self) -> IdentityResult<Option<CallbackReply>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_picks_known_keys() {
        let reply = CallbackReply::from_pairs([
            ("access_token", "at-1"),
            ("refresh_token", "rt-1"),
            ("expires_in", "3600"),
            ("state", "nonce"),
            ("color", "teal"),
        ]);

        assert_eq!(reply.access_token.as_deref(), Some("at-1"));
        assert_eq!(reply.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(reply.expires_in, Some(3600));
        assert_eq!(reply.state.as_deref(), Some("nonce"));
        assert!(reply.error.is_none());
    }

    #[test]
    fn from_pairs_tolerates_bad_expiry() {
        let reply = CallbackReply::from_pairs([("expires_in", "soon")]);
        assert_eq!(reply.expires_in, None);
    }

    #[test]
    fn meaningful_requires_tokens_or_error() {
        assert!(!CallbackReply::default().is_meaningful());
        assert!(CallbackReply::from_pairs([("error", "access_denied")]).is_meaningful());
        assert!(CallbackReply::from_pairs([("access_token", "t")]).is_meaningful());
        assert!(!CallbackReply::from_pairs([("state", "only")]).is_meaningful());
    }
}
