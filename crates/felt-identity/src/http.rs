//! HTTP implementation of [`IdentityBackend`] against the Felt identity
//! service.
//!
//! Endpoints live under `{identity_url}/v1/`. Every request carries the
//! app's publishable key; session-bound calls add a bearer token. Failures
//! come back as `{code, message}` bodies; the code travels through
//! [`BackendError`] untouched.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use felt_storage::{create_storage, CachedSession, MemoryStorage, StateVault, StorageScope};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::backend::{IdentityBackend, SessionEvents};
use crate::codes;
use crate::error::{BackendError, IdentityResult, STATE_MISMATCH, UNEXPECTED_RESPONSE};
use crate::flows::{AuthorizeRequest, CallbackReply, FlowDriver};
use crate::types::{AuthUser, FederatedProvider};

const EVENT_CAPACITY: usize = 16;

/// Assumed token lifetime when a provider reply carries no expiry at all.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Response bodies can hold tokens; log their shape, never their content.
fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

#[derive(Debug, Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrantRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

/// Map a non-success response body to a [`BackendError`].
///
/// The service's `{code, message}` shape wins when present. Otherwise the
/// status decides: 429 is always rate limiting, anything else takes the
/// caller's context-specific fallback code.
fn map_error_body(status: u16, body: &str, fallback_code: &str) -> BackendError {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(code) = parsed.code {
            let message = parsed
                .message
                .unwrap_or_else(|| format!("HTTP {}", status));
            return BackendError::new(code, message);
        }
    }
    let code = if status == 429 {
        codes::OVER_REQUEST_RATE_LIMIT
    } else {
        fallback_code
    };
    BackendError::new(
        code,
        format!("HTTP {} ({})", status, summarize_response_body(body)),
    )
}

/// Read the expiry claim out of an access token, without verifying it.
/// Only used as a fallback when a reply omits `expires_in`.
fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let payload = access_token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    let claims: JwtClaims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

fn session_from_token_response(data: TokenResponse) -> CachedSession {
    let expires_at = Utc::now() + Duration::seconds(data.expires_in);
    CachedSession {
        access_token: data.access_token,
        refresh_token: data.refresh_token,
        user_id: data.user.id,
        email: data.user.email,
        display_name: data.user.display_name,
        photo_url: data.user.photo_url,
        email_verified: data.user.email_verified,
        expires_at: expires_at.to_rfc3339(),
    }
}

/// Identity backend talking to the hosted Felt identity service.
pub struct HttpIdentityBackend {
    http_client: reqwest::Client,
    identity_url: String,
    publishable_key: String,
    state_dir: PathBuf,
    flows: Arc<dyn FlowDriver>,
    /// Session cache. Starts session-scoped; the persistence gate swaps
    /// in the configured scope before anything reads it.
    cache: Mutex<StateVault>,
    events: broadcast::Sender<Option<AuthUser>>,
}

impl HttpIdentityBackend {
    pub fn new(
        identity_url: impl Into<String>,
        publishable_key: impl Into<String>,
        state_dir: impl Into<PathBuf>,
        flows: Arc<dyn FlowDriver>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let identity_url = identity_url.into().trim_end_matches('/').to_string();
        Self {
            http_client: reqwest::Client::new(),
            identity_url,
            publishable_key: publishable_key.into(),
            state_dir: state_dir.into(),
            flows,
            cache: Mutex::new(StateVault::new(Arc::new(MemoryStorage::new()))),
            events,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.identity_url, path)
    }

    fn emit(&self, user: Option<AuthUser>) {
        let _ = self.events.send(user);
    }

    async fn error_from_response(
        &self,
        response: reqwest::Response,
        fallback_code: &str,
    ) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = map_error_body(status.as_u16(), &body, fallback_code);
        warn!(
            status = %status,
            code = %err.code,
            body_summary = %summarize_response_body(&body),
            "identity request failed"
        );
        err
    }

    async fn cached_session(&self) -> IdentityResult<Option<CachedSession>> {
        let cache = self.cache.lock().await;
        Ok(cache.load_session()?)
    }

    async fn store_and_emit(&self, session: CachedSession) -> IdentityResult<AuthUser> {
        let user = AuthUser::from(&session);
        {
            let cache = self.cache.lock().await;
            cache.store_session(&session)?;
        }
        self.emit(Some(user.clone()));
        Ok(user)
    }

    async fn token_request<T: Serialize + ?Sized>(
        &self,
        grant_type: &str,
        body: &T,
        fallback_code: &str,
    ) -> IdentityResult<TokenResponse> {
        let url = format!("{}?grant_type={}", self.auth_url("token"), grant_type);
        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, fallback_code).await);
        }
        Ok(response.json().await?)
    }

    async fn fetch_profile(&self, access_token: &str) -> IdentityResult<WireUser> {
        let response = self
            .http_client
            .get(self.auth_url("user"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, UNEXPECTED_RESPONSE).await);
        }
        Ok(response.json().await?)
    }

    async fn refresh_session(&self, refresh_token: &str) -> IdentityResult<AuthUser> {
        let data = self
            .token_request(
                "refresh_token",
                &RefreshGrantRequest { refresh_token },
                codes::SESSION_MISSING,
            )
            .await?;
        self.store_and_emit(session_from_token_response(data)).await
    }

    fn build_authorize_request(
        &self,
        provider: &FederatedProvider,
    ) -> IdentityResult<AuthorizeRequest> {
        let state = Uuid::new_v4().to_string();
        let mut url = Url::parse(&self.auth_url("authorize")).map_err(|e| {
            BackendError::new(UNEXPECTED_RESPONSE, format!("bad identity URL: {}", e))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("provider", provider.id());
            query.append_pair("state", &state);
            if !provider.scopes().is_empty() {
                query.append_pair("scopes", &provider.scopes().join(" "));
            }
            for (key, value) in provider.params() {
                query.append_pair(key, value);
            }
        }
        Ok(AuthorizeRequest { url, state })
    }

    /// Turn a provider reply into a stored session.
    async fn complete_with_reply(&self, reply: CallbackReply) -> IdentityResult<AuthUser> {
        if let Some(code) = reply.error {
            let message = reply
                .error_description
                .unwrap_or_else(|| "the provider reported a failure".to_string());
            return Err(BackendError::new(code, message));
        }
        let (Some(access_token), Some(refresh_token)) =
            (reply.access_token, reply.refresh_token)
        else {
            return Err(BackendError::new(
                UNEXPECTED_RESPONSE,
                "provider reply is missing its tokens",
            ));
        };

        let expires_at = match reply.expires_in {
            Some(secs) => Utc::now() + Duration::seconds(secs),
            None => token_expiry(&access_token)
                .unwrap_or_else(|| Utc::now() + Duration::seconds(DEFAULT_EXPIRES_IN_SECS)),
        };

        let profile = self.fetch_profile(&access_token).await?;
        let session = CachedSession {
            access_token,
            refresh_token,
            user_id: profile.id,
            email: profile.email,
            display_name: profile.display_name,
            photo_url: profile.photo_url,
            email_verified: profile.email_verified,
            expires_at: expires_at.to_rfc3339(),
        };
        self.store_and_emit(session).await
    }
}

#[async_trait]
impl IdentityBackend for HttpIdentityBackend {
    async fn apply_persistence(&self, scope: StorageScope) -> IdentityResult<()> {
        let storage = create_storage(scope, &self.state_dir)?;
        let mut cache = self.cache.lock().await;
        *cache = StateVault::new(storage);
        debug!(?scope, "session cache durability applied");
        Ok(())
    }

    async fn restore(&self) -> IdentityResult<()> {
        let cached = match self.cached_session().await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(code = %err.code, "could not read the cached session");
                self.emit(None);
                return Ok(());
            }
        };

        match cached {
            Some(session) if !session.is_expired() => {
                let user = AuthUser::from(&session);
                info!(user_id = %user.id, "restored cached session");
                self.emit(Some(user));
            }
            Some(session) => {
                debug!("cached session is stale; refreshing");
                if let Err(err) = self.refresh_session(&session.refresh_token).await {
                    warn!(code = %err.code, "session refresh failed; reporting signed out");
                    // An unreachable service is not a revoked session; keep
                    // the record around for the next launch.
                    if !err.is_code(codes::NETWORK_REQUEST_FAILED) {
                        let cache = self.cache.lock().await;
                        let _ = cache.clear_session();
                    }
                    self.emit(None);
                }
            }
            None => {
                debug!("no cached session");
                self.emit(None);
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> SessionEvents {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<AuthUser> {
        let data = self
            .token_request(
                "password",
                &PasswordGrantRequest { email, password },
                codes::INVALID_CREDENTIALS,
            )
            .await?;
        info!("password sign-in succeeded");
        self.store_and_emit(session_from_token_response(data)).await
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> IdentityResult<AuthUser> {
        let response = self
            .http_client
            .post(self.auth_url("signup"))
            .header("apikey", &self.publishable_key)
            .json(&PasswordGrantRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, UNEXPECTED_RESPONSE).await);
        }
        let data: TokenResponse = response.json().await?;
        info!("account created");
        self.store_and_emit(session_from_token_response(data)).await
    }

    async fn sign_in_with_popup(&self, provider: &FederatedProvider) -> IdentityResult<AuthUser> {
        let request = self.build_authorize_request(provider)?;
        let reply = self.flows.run_popup(&request).await?;

        if reply.state.as_deref() != Some(request.state.as_str()) {
            return Err(BackendError::new(
                STATE_MISMATCH,
                "popup reply did not echo the expected state",
            ));
        }
        self.complete_with_reply(reply).await
    }

    async fn begin_redirect(&self, provider: &FederatedProvider) -> IdentityResult<()> {
        let request = self.build_authorize_request(provider)?;
        self.flows.begin_redirect(&request).await
    }

    async fn take_redirect_result(&self) -> IdentityResult<Option<AuthUser>> {
        let Some(reply) = self.flows.take_redirect_reply().await? else {
            return Ok(None);
        };
        let user = self.complete_with_reply(reply).await?;
        Ok(Some(user))
    }

    async fn sign_out(&self) -> IdentityResult<()> {
        let session = {
            let cache = self.cache.lock().await;
            let session = cache.load_session().unwrap_or(None);
            let _ = cache.clear_session();
            session
        };
        self.emit(None);

        // The local session is gone either way; a failed revoke only means
        // the server-side session outlives us a little.
        if let Some(session) = session {
            let result = self
                .http_client
                .post(self.auth_url("logout"))
                .header("apikey", &self.publishable_key)
                .header("Authorization", format!("Bearer {}", session.access_token))
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!(status = %response.status(), "server-side sign-out failed");
                }
                Err(err) => {
                    warn!(error = %err, "server-side sign-out failed");
                }
                Ok(_) => {}
            }
        }
        info!("signed out");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> IdentityResult<()> {
        let response = self
            .http_client
            .post(self.auth_url("recover"))
            .header("apikey", &self.publishable_key)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, UNEXPECTED_RESPONSE).await);
        }
        info!("password reset email requested");
        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> IdentityResult<()> {
        // Redeeming the token yields a short-lived session; it is used for
        // the password update and then dropped without touching the cache.
        let response = self
            .http_client
            .post(self.auth_url("verify"))
            .header("apikey", &self.publishable_key)
            .json(&serde_json::json!({ "type": "recovery", "token": token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(
                self.error_from_response(response, codes::RESET_TOKEN_INVALID)
                    .await,
            );
        }
        let data: TokenResponse = response.json().await?;

        let response = self
            .http_client
            .put(self.auth_url("user"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", data.access_token))
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, codes::WEAK_PASSWORD).await);
        }
        info!("password reset confirmed");
        Ok(())
    }

    async fn send_verification_email(&self) -> IdentityResult<()> {
        let Some(session) = self.cached_session().await? else {
            return Err(BackendError::new(
                codes::SESSION_MISSING,
                "no active session to verify",
            ));
        };
        let Some(email) = session.email else {
            return Err(BackendError::new(
                codes::SESSION_MISSING,
                "current session has no email address",
            ));
        };

        let response = self
            .http_client
            .post(self.auth_url("resend"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .json(&serde_json::json!({ "type": "signup", "email": email }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, UNEXPECTED_RESPONSE).await);
        }
        info!("verification email requested");
        Ok(())
    }

    async fn reload_user(&self) -> IdentityResult<Option<AuthUser>> {
        let Some(mut session) = self.cached_session().await? else {
            return Ok(None);
        };
        let profile = self.fetch_profile(&session.access_token).await?;

        session.user_id = profile.id;
        session.email = profile.email;
        session.display_name = profile.display_name;
        session.photo_url = profile.photo_url;
        session.email_verified = profile.email_verified;

        let user = AuthUser::from(&session);
        {
            let cache = self.cache.lock().await;
            cache.store_session(&session)?;
        }
        self.emit(Some(user.clone()));
        Ok(Some(user))
    }
}
