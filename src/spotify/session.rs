use std::{future::Future, sync::Arc};

use crate::{
    Res, debug,
    error::{AuthError, Error},
    spotify::auth::TokenProvider,
};

/// Runs an authenticated operation with at most one refresh and one retry.
///
/// The operation receives the bearer token to use. If it fails with an
/// authorization failure (or there is no token to begin with), the provider
/// is asked for a new token once and the operation runs once more; whatever
/// the second run returns is final.
///
/// # Failure handling
///
/// - Errors that are not authorization failures return immediately
/// - A failed refresh returns [`Error::ReauthorizationRequired`] wrapping
///   the original failure, so the caller can tell the user to sign in again
/// - A second authorization failure after the retry is returned unchanged
///
/// # Example
///
/// ```ignore
/// let guard = SessionGuard::new(tokens);
/// let devices = guard
///     .run(|token| async move { resolver.list_devices(&token).await })
///     .await?;
/// ```
pub struct SessionGuard {
    tokens: Arc<dyn TokenProvider>,
}

impl SessionGuard {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self { tokens }
    }

    /// Calls `operation` with the current token, refreshing and calling it
    /// once more on an authorization failure.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Res<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Res<T>>,
    {
        let first = match self.tokens.access_token().await {
            Some(token) => operation(token).await,
            None => Err(Error::NoToken),
        };

        let original = match first {
            Err(e) if e.is_auth_failure() => e,
            result => return result,
        };
        debug!("Authorization failure ({}), refreshing token", original);

        let refreshed = match self.tokens.refresh_access_token().await {
            Ok(state) => state,
            Err(refresh) => return Err(reauthorization_required(original, refresh)),
        };

        let Some(token) = refreshed.access_token() else {
            return Err(reauthorization_required(
                original,
                AuthError::RefreshFailed("no access token after refresh".to_string()),
            ));
        };

        operation(token.to_string()).await
    }
}

fn reauthorization_required(original: Error, refresh: AuthError) -> Error {
    Error::ReauthorizationRequired {
        source: Box::new(original),
        refresh,
    }
}
