use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    debug,
    management::{KeyValueStore, StoreError, StoreKey},
    types::{AuthorizationAttempt, TokenResponse},
    warning,
};

/// Client identity registered with the provider, fixed for the process.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// The live token pair.
///
/// Either empty, or holding a non-empty access token; there is no way to
/// build a state with an empty access token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an authenticated state, `None` if `access_token` is empty.
    pub fn authenticated(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return None;
        }
        Some(Self {
            access_token: Some(access_token),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        })
    }

    /// Builds the next state from a token endpoint response.
    ///
    /// A missing refresh token in the response keeps `previous_refresh`,
    /// since providers only sometimes rotate it. An `expires_in` that does not
    /// fit a timestamp is treated as unknown expiry.
    pub fn from_response(
        response: &TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let refresh = response
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .or(previous_refresh);
        let expires_at = response
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));

        Self::authenticated(response.access_token.clone(), refresh, expires_at)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True when the token is known to expire within `margin` of `now`.
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
        match expires_at.checked_sub_signed(margin) {
            Some(refresh_at) => refresh_at <= now,
            None => true,
        }
    }
}

/// Holds client identity and the current token pair, and owns persistence of
/// the refresh token and of the pending authorization.
pub struct CredentialStore {
    credentials: Credentials,
    tokens: RwLock<TokenState>,
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(credentials: Credentials, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            credentials,
            tokens: RwLock::new(TokenState::empty()),
            store,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn current(&self) -> TokenState {
        self.tokens.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access_token.clone()
    }

    /// Swaps in a new token state as one assignment.
    pub async fn replace(&self, state: TokenState) {
        *self.tokens.write().await = state;
    }

    pub async fn clear(&self) {
        self.replace(TokenState::empty()).await;
    }

    /// The refresh token to use next: the in-memory one if present, else the
    /// durably stored one.
    pub async fn refresh_token(&self) -> Option<String> {
        if let Some(token) = self.tokens.read().await.refresh_token.clone() {
            return Some(token);
        }
        self.stored_refresh_token().await
    }

    pub async fn stored_refresh_token(&self) -> Option<String> {
        match self.store.get(StoreKey::RefreshToken).await {
            Ok(token) => token,
            Err(e) => {
                warning!("Could not read saved refresh token: {}", e);
                None
            }
        }
    }

    /// Writes the refresh token to durable storage.
    ///
    /// Best effort: a failure is printed as a warning and the in-memory
    /// session stays usable, it just cannot be resumed on the next run.
    pub async fn persist_refresh_token(&self, token: &str) -> bool {
        match self.store.set(StoreKey::RefreshToken, token).await {
            Ok(()) => {
                debug!("Refresh token saved");
                true
            }
            Err(e) => {
                warning!("Could not save refresh token: {}", e);
                false
            }
        }
    }

    pub async fn forget_refresh_token(&self) -> Result<(), StoreError> {
        self.store.delete(StoreKey::RefreshToken).await
    }

    /// Stores `attempt` as the only pending authorization.
    pub async fn save_pending(&self, attempt: &AuthorizationAttempt) -> Result<(), StoreError> {
        let json = serde_json::to_string(attempt)?;
        self.store.set(StoreKey::PendingAuthState, &json).await
    }

    /// Returns the pending authorization without consuming it.
    pub async fn pending(&self) -> Result<Option<AuthorizationAttempt>, StoreError> {
        match self.store.get(StoreKey::PendingAuthState).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Reads and deletes the pending authorization.
    ///
    /// The slot is cleared even when its content cannot be parsed, so a
    /// nonce is never seen twice.
    pub async fn take_pending(&self) -> Result<Option<AuthorizationAttempt>, StoreError> {
        let raw = self.store.get(StoreKey::PendingAuthState).await;
        let deleted = self.store.delete(StoreKey::PendingAuthState).await;

        let attempt = match raw? {
            Some(json) => serde_json::from_str(&json).ok(),
            None => None,
        };
        deleted?;
        Ok(attempt)
    }
}
