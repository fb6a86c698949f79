//! Core identity types shared across backends.

use felt_storage::CachedSession;
use serde::{Deserialize, Serialize};

/// A signed-in user, as exposed to the rest of the client.
///
/// This is the profile subset the UI needs. Tokens stay inside the
/// backend and never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Stable identity handle issued by the service
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl From<&CachedSession> for AuthUser {
    fn from(session: &CachedSession) -> Self {
        Self {
            id: session.user_id.clone(),
            email: session.email.clone(),
            display_name: session.display_name.clone(),
            photo_url: session.photo_url.clone(),
            email_verified: session.email_verified,
        }
    }
}

/// A federated sign-in provider plus the authorization options to request.
///
/// ```
/// use felt_identity::FederatedProvider;
///
/// let provider = FederatedProvider::google()
///     .with_scope("https://www.googleapis.com/auth/userinfo.email");
/// assert_eq!(provider.id(), "google");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProvider {
    id: String,
    scopes: Vec<String>,
    params: Vec<(String, String)>,
}

impl FederatedProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scopes: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn google() -> Self {
        Self::new("google")
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Add a provider-specific authorization parameter, e.g. a login hint.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_from_cached_session_drops_tokens() {
        let session = CachedSession {
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            user_id: "user-1".to_string(),
            email: Some("a@felt.im".to_string()),
            display_name: Some("Ada".to_string()),
            photo_url: None,
            email_verified: true,
            expires_at: "2099-01-01T00:00:00Z".to_string(),
        };

        let user = AuthUser::from(&session);
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("a@felt.im"));
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert!(user.email_verified);

        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("secret-"), "tokens must not serialize: {}", json);
    }

    #[test]
    fn provider_builder_accumulates_options() {
        let provider = FederatedProvider::google()
            .with_scope("email")
            .with_scope("profile")
            .with_param("prompt", "select_account");

        assert_eq!(provider.id(), "google");
        assert_eq!(provider.scopes(), ["email", "profile"]);
        assert_eq!(
            provider.params(),
            [("prompt".to_string(), "select_account".to_string())]
        );
    }

    #[test]
    fn user_deserializes_with_missing_optionals() {
        let user: AuthUser = serde_json::from_str(r#"{"id":"u1"}"#).expect("deserialize");
        assert_eq!(user.id, "u1");
        assert!(user.email.is_none());
        assert!(!user.email_verified);
    }
}
