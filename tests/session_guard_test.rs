use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use spotctl::{
    Res,
    error::{AuthError, Error, PlaybackError, ValidationError},
    management::TokenState,
    spotify::{auth::TokenProvider, session::SessionGuard},
};
use tokio::sync::Mutex;

/// Hands out `initial` first and `refreshed` after every refresh.
struct CountingTokens {
    current: Mutex<Option<String>>,
    refreshed: Option<String>,
    refreshes: AtomicUsize,
}

impl CountingTokens {
    fn new(initial: Option<&str>, refreshed: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(initial.map(str::to_string)),
            refreshed: refreshed.map(str::to_string),
            refreshes: AtomicUsize::new(0),
        })
    }

    fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for CountingTokens {
    async fn access_token(&self) -> Option<String> {
        self.current.lock().await.clone()
    }

    async fn refresh_access_token(&self) -> Result<TokenState, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let Some(token) = self.refreshed.clone() else {
            return Err(AuthError::Incomplete("user went away".to_string()));
        };
        *self.current.lock().await = Some(token.clone());
        TokenState::authenticated(token, None, None)
            .ok_or_else(|| AuthError::RefreshFailed("empty".to_string()))
    }
}

fn unauthorized() -> Error {
    Error::Api {
        status: StatusCode::UNAUTHORIZED,
        body: "The access token expired".to_string(),
    }
}

#[tokio::test]
async fn test_success_needs_no_refresh() {
    let tokens = CountingTokens::new(Some("t1"), Some("t2"));
    let guard = SessionGuard::new(tokens.clone());
    let calls = AtomicUsize::new(0);

    let result: Res<String> = guard
        .run(|token| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(token) }
        })
        .await;

    assert_eq!(result.unwrap(), "t1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.refreshes(), 0);
}

#[tokio::test]
async fn test_auth_failure_refreshes_once_and_retries_once() {
    let tokens = CountingTokens::new(Some("expired"), Some("fresh"));
    let guard = SessionGuard::new(tokens.clone());
    let seen = std::sync::Mutex::new(Vec::new());

    let result: Res<&str> = guard
        .run(|token| {
            seen.lock().unwrap().push(token.clone());
            async move {
                if token == "expired" {
                    Err(unauthorized())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(tokens.refreshes(), 1);
    assert_eq!(*seen.lock().unwrap(), vec!["expired", "fresh"]);
}

#[tokio::test]
async fn test_second_failure_is_final() {
    let tokens = CountingTokens::new(Some("t1"), Some("t2"));
    let guard = SessionGuard::new(tokens.clone());
    let calls = AtomicUsize::new(0);

    let result: Res<()> = guard
        .run(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unauthorized()) }
        })
        .await;

    assert!(matches!(
        result.unwrap_err(),
        Error::Api { status, .. } if status == StatusCode::UNAUTHORIZED
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(tokens.refreshes(), 1);
}

#[tokio::test]
async fn test_forbidden_counts_as_auth_failure() {
    let tokens = CountingTokens::new(Some("t1"), Some("t2"));
    let guard = SessionGuard::new(tokens.clone());

    let result: Res<&str> = guard
        .run(|token| async move {
            if token == "t1" {
                Err(Error::Playback(PlaybackError::ApiRejected {
                    status: StatusCode::FORBIDDEN,
                    body: String::new(),
                }))
            } else {
                Ok("ok")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(tokens.refreshes(), 1);
}

#[tokio::test]
async fn test_other_failures_are_not_retried() {
    let tokens = CountingTokens::new(Some("t1"), Some("t2"));
    let guard = SessionGuard::new(tokens.clone());
    let calls = AtomicUsize::new(0);

    let result: Res<()> = guard
        .run(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::Api {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "oops".to_string(),
                })
            }
        })
        .await;

    assert!(matches!(result.unwrap_err(), Error::Api { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.refreshes(), 0);
}

#[tokio::test]
async fn test_validation_errors_are_not_retried() {
    let tokens = CountingTokens::new(Some("t1"), Some("t2"));
    let guard = SessionGuard::new(tokens.clone());

    let result: Res<()> = guard
        .run(|_| async { Err(ValidationError::InvalidVolume(150).into()) })
        .await;

    assert!(matches!(
        result.unwrap_err(),
        Error::Validation(ValidationError::InvalidVolume(150))
    ));
    assert_eq!(tokens.refreshes(), 0);
}

#[tokio::test]
async fn test_missing_token_refreshes_before_first_call() {
    let tokens = CountingTokens::new(None, Some("fresh"));
    let guard = SessionGuard::new(tokens.clone());
    let calls = AtomicUsize::new(0);

    let result: Res<String> = guard
        .run(|token| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(token) }
        })
        .await;

    assert_eq!(result.unwrap(), "fresh");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.refreshes(), 1);
}

#[tokio::test]
async fn test_failed_refresh_requires_reauthorization() {
    let tokens = CountingTokens::new(Some("expired"), None);
    let guard = SessionGuard::new(tokens.clone());
    let calls = AtomicUsize::new(0);

    let result: Res<()> = guard
        .run(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unauthorized()) }
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.requires_reauthorization());
    match err {
        Error::ReauthorizationRequired { source, refresh } => {
            assert!(matches!(*source, Error::Api { status, .. } if status == StatusCode::UNAUTHORIZED));
            assert!(matches!(refresh, AuthError::Incomplete(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.refreshes(), 1);
}
