//! OAuth 2.0 authorization-code flow with client-secret Basic auth.
//!
//! States: `Unauthenticated -> AwaitingUserAuthorization -> Authenticated`.
//! A failed refresh moves an authenticated session back to
//! `AwaitingUserAuthorization`; a successful code exchange moves it to
//! `Authenticated`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use tokio::sync::Mutex;

use crate::{
    config::Settings,
    debug,
    error::AuthError,
    info,
    management::{CredentialStore, TokenState},
    success,
    types::{AuthorizationAttempt, AuthorizationCallback, TokenResponse},
    utils, warning,
};

/// Capabilities requested on every authorization.
pub const SCOPES: [&str; 7] = [
    "user-read-private",
    "user-read-email",
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "playlist-read-private",
    "playlist-read-collaborative",
];

/// Where the session stands in the authorization lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    AwaitingUserAuthorization,
    Authenticated,
}

/// The interactive half of the flow: show the authorization URL to the user
/// and hand back whatever arrives at the redirect URI.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    async fn authorize(&self, authorization_url: &str)
    -> Result<AuthorizationCallback, AuthError>;
}

/// Source of bearer tokens for authenticated operations.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The token to use for the next call, if any.
    async fn access_token(&self) -> Option<String>;

    /// Mints a new access token, re-authorizing interactively if needed.
    async fn refresh_access_token(&self) -> Result<TokenState, AuthError>;
}

/// Drives the OAuth 2.0 authorization-code flow and owns token refresh.
///
/// The manager is the only writer of the live [`TokenState`]; every change
/// goes through [`CredentialStore::replace`], which swaps access token,
/// refresh token and expiry in one step.
///
/// # Lifecycle
///
/// 1. **Begin**: [`begin_authorization`](Self::begin_authorization) creates a
///    single-use state nonce, persists it and returns the URL to visit
/// 2. **Prompt**: the [`AuthorizationPrompt`] shows the URL and collects the
///    redirect parameters
/// 3. **Complete**: [`complete_authorization`](Self::complete_authorization)
///    consumes the nonce, verifies it and exchanges the code
/// 4. **Refresh**: [`refresh_access_token`](Self::refresh_access_token) mints
///    new tokens from the refresh token, or starts over at step 1
///
/// # Concurrency
///
/// Refreshes, interactive authorizations and logout serialize on one lock.
/// A caller that waited while another refresh replaced the token returns that
/// token instead of spending the (possibly already rotated) refresh token a
/// second time.
///
/// # Example
///
/// ```ignore
/// let tokens = TokenManager::new(http, settings, credentials, prompt);
/// let state = tokens.start_session().await?;
/// println!("token valid until {:?}", state.expires_at());
/// ```
pub struct TokenManager {
    http: Client,
    settings: Arc<Settings>,
    credentials: Arc<CredentialStore>,
    prompt: Arc<dyn AuthorizationPrompt>,
    phase: Mutex<AuthPhase>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        http: Client,
        settings: Arc<Settings>,
        credentials: Arc<CredentialStore>,
        prompt: Arc<dyn AuthorizationPrompt>,
    ) -> Self {
        Self {
            http,
            settings,
            credentials,
            prompt,
            phase: Mutex::new(AuthPhase::Unauthenticated),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current phase, for status output and tests.
    pub async fn phase(&self) -> AuthPhase {
        *self.phase.lock().await
    }

    async fn set_phase(&self, phase: AuthPhase) {
        *self.phase.lock().await = phase;
    }

    /// Starts a new authorization and returns the URL the user must visit.
    ///
    /// Overwrites any previously pending authorization.
    ///
    /// # Errors
    ///
    /// - [`AuthError::EntropyUnavailable`] if the OS RNG fails and weak
    ///   nonces are not allowed
    /// - [`AuthError::ExchangeFailed`] if the nonce cannot be persisted or
    ///   the configured endpoint is not a valid URL
    pub async fn begin_authorization(&self) -> Result<String, AuthError> {
        let state = match utils::generate_state_nonce() {
            Ok(state) => state,
            Err(e) if self.settings.allow_weak_state => {
                warning!(
                    "Secure random source unavailable ({}), using a time-seeded state. CSRF protection is degraded.",
                    e
                );
                utils::fallback_state_nonce(32)
            }
            Err(e) => return Err(AuthError::EntropyUnavailable(e)),
        };

        let attempt = AuthorizationAttempt {
            state,
            redirect_uri: self.settings.redirect_uri.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        };

        let url = Url::parse_with_params(
            &self.settings.auth_url,
            &[
                ("client_id", self.credentials.credentials().client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", attempt.redirect_uri.as_str()),
                ("scope", attempt.scopes.join(" ").as_str()),
                ("state", attempt.state.as_str()),
            ],
        )
        .map_err(|e| AuthError::ExchangeFailed(format!("invalid authorization URL: {}", e)))?;

        self.credentials
            .save_pending(&attempt)
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("cannot save auth state: {}", e)))?;
        self.set_phase(AuthPhase::AwaitingUserAuthorization).await;

        Ok(url.into())
    }

    /// Verifies `received_state` against the pending authorization and
    /// exchanges `received_code` for tokens.
    ///
    /// The pending authorization is consumed before anything else, so a
    /// mismatching or failed attempt cannot be retried without calling
    /// [`begin_authorization`](Self::begin_authorization) again.
    pub async fn complete_authorization(
        &self,
        received_code: &str,
        received_state: &str,
    ) -> Result<TokenState, AuthError> {
        let pending = self
            .credentials
            .take_pending()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("cannot read auth state: {}", e)))?;

        let result = self.verify_and_exchange(pending, received_code, received_state).await;
        if result.is_err() {
            let phase = if self.credentials.current().await.is_authenticated() {
                AuthPhase::Authenticated
            } else {
                AuthPhase::Unauthenticated
            };
            self.set_phase(phase).await;
        }
        result
    }

    async fn verify_and_exchange(
        &self,
        pending: Option<AuthorizationAttempt>,
        received_code: &str,
        received_state: &str,
    ) -> Result<TokenState, AuthError> {
        let attempt = pending.ok_or(AuthError::FlowExpired)?;

        let ttl = chrono::Duration::from_std(self.settings.pending_auth_ttl)
            .unwrap_or(chrono::Duration::MAX);
        if Utc::now() - attempt.created_at > ttl {
            debug!("Pending authorization created at {} expired", attempt.created_at);
            return Err(AuthError::FlowExpired);
        }

        if received_state != attempt.state {
            return Err(AuthError::StateMismatch);
        }

        let code = received_code.trim();
        if code.is_empty() {
            return Err(AuthError::ExchangeFailed(
                "no authorization code provided".to_string(),
            ));
        }

        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", attempt.redirect_uri.as_str()),
            ])
            .await
            .map_err(AuthError::ExchangeFailed)?;

        let state = TokenState::from_response(&response, None, Utc::now()).ok_or_else(|| {
            AuthError::ExchangeFailed("no access token received".to_string())
        })?;

        self.install(state.clone(), response.refresh_token.as_deref())
            .await;
        Ok(state)
    }

    /// Mints a new access token from the stored refresh token.
    ///
    /// Without a refresh token, or when the provider rejects it, this falls
    /// through to the full interactive authorization.
    ///
    /// A refresh token returned by the provider replaces the stored one;
    /// when the response carries none, the previous one stays in use.
    ///
    /// # Errors
    ///
    /// Only errors of the interactive fallback reach the caller:
    /// [`AuthError::Denied`], [`AuthError::Incomplete`],
    /// [`AuthError::StateMismatch`] or [`AuthError::ExchangeFailed`]. A
    /// failed refresh grant itself is logged and then re-authorized.
    ///
    /// Concurrent callers collapse into one refresh: whoever waits on the
    /// lock while another refresh installs a new token gets that token back.
    pub async fn refresh_access_token(&self) -> Result<TokenState, AuthError> {
        let observed = self.credentials.current().await;
        let _guard = self.refresh_lock.lock().await;

        let current = self.credentials.current().await;
        if current.is_authenticated() && current != observed {
            debug!("Token already refreshed by a concurrent caller");
            return Ok(current);
        }

        let Some(refresh_token) = self.credentials.refresh_token().await else {
            info!("No refresh token available, starting authorization.");
            return self.authorize_interactively().await;
        };

        match self.refresh_grant(&refresh_token).await {
            Ok(state) => Ok(state),
            Err(e) => {
                warning!("{}", e);
                self.set_phase(AuthPhase::AwaitingUserAuthorization).await;
                self.authorize_interactively().await
            }
        }
    }

    /// Resumes a previous session from the durable refresh token, falling
    /// back to the interactive flow.
    pub async fn start_session(&self) -> Result<TokenState, AuthError> {
        if self.credentials.stored_refresh_token().await.is_some() {
            info!("Resuming previous session...");
        }
        let state = self.refresh_access_token().await?;
        success!("Authenticated with Spotify.");
        Ok(state)
    }

    /// Runs a fresh authorization regardless of any stored token.
    pub async fn authorize(&self) -> Result<TokenState, AuthError> {
        let _guard = self.refresh_lock.lock().await;
        self.authorize_interactively().await
    }

    /// Current access token, refreshed silently first when it is about to
    /// expire. A failed silent refresh keeps the current token.
    pub async fn valid_access_token(&self) -> Option<String> {
        let current = self.credentials.current().await;
        if !current.expires_within(self.settings.refresh_margin, Utc::now()) {
            return current.access_token().map(str::to_string);
        }

        let _guard = self.refresh_lock.lock().await;
        let latest = self.credentials.current().await;
        if latest != current {
            return latest.access_token().map(str::to_string);
        }

        if let Some(refresh_token) = self.credentials.refresh_token().await {
            debug!("Access token expires soon, refreshing");
            match self.refresh_grant(&refresh_token).await {
                Ok(state) => return state.access_token().map(str::to_string),
                Err(e) => debug!("Proactive refresh failed: {}", e),
            }
        }
        current.access_token().map(str::to_string)
    }

    /// Forgets all tokens, in memory and on disk.
    ///
    /// # Errors
    ///
    /// [`AuthError::RefreshFailed`] if the stored refresh token cannot be
    /// deleted; the in-memory state is cleared regardless.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        self.credentials.clear().await;
        self.set_phase(AuthPhase::Unauthenticated).await;
        self.credentials
            .forget_refresh_token()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("cannot remove refresh token: {}", e)))
    }

    async fn authorize_interactively(&self) -> Result<TokenState, AuthError> {
        let url = self.begin_authorization().await?;
        let callback = self.prompt.authorize(&url).await?;

        if let Some(error) = callback.error {
            // The attempt is still consumed so it cannot be replayed.
            if let Err(e) = self.credentials.take_pending().await {
                warning!("Could not discard the pending authorization: {}", e);
            }
            self.set_phase(AuthPhase::Unauthenticated).await;
            return Err(AuthError::Denied(error));
        }

        self.complete_authorization(
            callback.code.as_deref().unwrap_or_default(),
            callback.state.as_deref().unwrap_or_default(),
        )
        .await
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenState, AuthError> {
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await
            .map_err(AuthError::RefreshFailed)?;

        // Built completely before it replaces the live state.
        let state =
            TokenState::from_response(&response, Some(refresh_token.to_string()), Utc::now())
                .ok_or_else(|| {
                    AuthError::RefreshFailed("no access token received from refresh".to_string())
                })?;

        self.install(state.clone(), response.refresh_token.as_deref())
            .await;
        Ok(state)
    }

    async fn install(&self, state: TokenState, rotated_refresh: Option<&str>) {
        if let Some(expires_at) = state.expires_at() {
            debug!("Access token valid until {}", expires_at);
        }
        self.credentials.replace(state).await;
        self.set_phase(AuthPhase::Authenticated).await;

        if let Some(token) = rotated_refresh.filter(|t| !t.is_empty()) {
            self.credentials.persist_refresh_token(token).await;
        }
    }

    /// POSTs a grant to the token endpoint with client credentials as HTTP
    /// Basic auth. Non-2xx answers carry the status and body in the error.
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let credentials = self.credentials.credentials();
        let response = self
            .http
            .post(&self.settings.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| format!("error making token request: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("error reading token response: {}", e))?;

        if !status.is_success() {
            return Err(format!("token endpoint returned {}: {}", status, body));
        }

        serde_json::from_str(&body)
            .map_err(|e| format!("error parsing token response: {} ({})", e, body))
    }
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn access_token(&self) -> Option<String> {
        self.valid_access_token().await
    }

    async fn refresh_access_token(&self) -> Result<TokenState, AuthError> {
        TokenManager::refresh_access_token(self).await
    }
}

