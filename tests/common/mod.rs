#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use reqwest::Url;
use serde_json::Value;

use spotctl::{
    browser::{BrowserLauncher, BrowserPreference},
    config::Settings,
    error::{AuthError, BrowserFallbackError},
    management::{KeyValueStore, MemoryStore, StoreError, StoreKey},
    spotify::auth::AuthorizationPrompt,
    types::AuthorizationCallback,
};

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";

/// A request as seen by the fake provider.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn form(&self) -> HashMap<String, String> {
        url_pairs(&self.body)
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct Inner {
    requests: Vec<Recorded>,
    scripts: HashMap<(Method, String), VecDeque<(StatusCode, String)>>,
    stalls: HashMap<(Method, String), Duration>,
}

/// Stand-in for the accounts service and the Web API.
///
/// Responses are scripted per method and path. Each scripted response is
/// served once, except the last one which repeats. Unscripted routes answer
/// `404`.
#[derive(Clone)]
pub struct FakeProvider {
    base_url: String,
    inner: Arc<Mutex<Inner>>,
}

impl FakeProvider {
    pub async fn start() -> Self {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let app = Router::new().fallback(handle).with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            inner,
        }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Settings pointing every endpoint at this provider.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::new(CLIENT_ID, CLIENT_SECRET);
        settings.auth_url = format!("{}/authorize", self.base_url);
        settings.token_url = format!("{}/api/token", self.base_url);
        settings.api_url = format!("{}/v1", self.base_url);
        settings.http_timeout = Duration::from_secs(5);
        settings.device_poll_attempts = 3;
        settings.device_poll_interval = Duration::from_millis(20);
        settings.auth_timeout = Duration::from_secs(5);
        settings
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.inner
            .lock()
            .unwrap()
            .scripts
            .entry((method, path.to_string()))
            .or_default()
            .push_back((StatusCode::from_u16(status).unwrap(), body));
    }

    /// Holds every response on this route for `delay` before answering.
    pub fn stall(&self, method: Method, path: &str, delay: Duration) {
        self.inner
            .lock()
            .unwrap()
            .stalls
            .insert((method, path.to_string()), delay);
    }

    /// Scripts a successful token endpoint response.
    pub fn token(&self, access: &str, refresh: Option<&str>, expires_in: i64) {
        let mut body = serde_json::json!({
            "access_token": access,
            "token_type": "Bearer",
            "expires_in": expires_in,
        });
        if let Some(refresh) = refresh {
            body["refresh_token"] = Value::String(refresh.to_string());
        }
        self.respond(Method::POST, "/api/token", 200, body);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    pub fn token_requests(&self) -> Vec<Recorded> {
        self.requests_to(Method::POST, "/api/token")
    }
}

async fn handle(
    State(inner): State<Arc<Mutex<Inner>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let (stall, scripted) = {
        let mut inner = inner.lock().unwrap();
        inner.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            query: url_pairs(uri.query().unwrap_or_default()),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: String::from_utf8_lossy(&body).into_owned(),
        });

        let key = (method, path);
        let stall = inner.stalls.get(&key).copied();
        let scripted = inner.scripts.get_mut(&key).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        (stall, scripted)
    };

    if let Some(delay) = stall {
        tokio::time::sleep(delay).await;
    }

    match scripted {
        Some((status, body)) => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not scripted").into_response(),
    }
}

fn url_pairs(encoded: &str) -> HashMap<String, String> {
    Url::parse(&format!("http://x/?{}", encoded))
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

/// Query parameter of an absolute URL.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// What the simulated user does with the authorization page.
#[derive(Debug, Clone)]
pub enum UserAction {
    /// Approve and return to the redirect URI with the right state.
    Approve(String),
    /// Return with a state that was never issued.
    ForgeState(String),
    Deny(String),
    /// Close the page without ever returning.
    Abandon,
}

pub struct ScriptedPrompt {
    action: UserAction,
    shown: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(action: UserAction) -> Arc<Self> {
        Arc::new(Self {
            action,
            shown: Mutex::new(Vec::new()),
        })
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationPrompt for ScriptedPrompt {
    async fn authorize(
        &self,
        authorization_url: &str,
    ) -> Result<AuthorizationCallback, AuthError> {
        self.shown
            .lock()
            .unwrap()
            .push(authorization_url.to_string());
        let state = query_param(authorization_url, "state");

        match &self.action {
            UserAction::Approve(code) => Ok(AuthorizationCallback {
                code: Some(code.clone()),
                state,
                error: None,
            }),
            UserAction::ForgeState(code) => Ok(AuthorizationCallback {
                code: Some(code.clone()),
                state: Some("forged-state".to_string()),
                error: None,
            }),
            UserAction::Deny(error) => Ok(AuthorizationCallback {
                code: None,
                state,
                error: Some(error.clone()),
            }),
            UserAction::Abandon => Err(AuthError::Incomplete("user went away".to_string())),
        }
    }
}

/// Records opened URLs; optionally fails every launch.
#[derive(Default)]
pub struct RecordingLauncher {
    fail: bool,
    opened: Mutex<Vec<(String, BrowserPreference)>>,
}

impl RecordingLauncher {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

impl BrowserLauncher for RecordingLauncher {
    fn open(&self, url: &str, preference: BrowserPreference) -> Result<(), BrowserFallbackError> {
        self.opened
            .lock()
            .unwrap()
            .push((url.to_string(), preference));
        if self.fail {
            return Err(BrowserFallbackError::LaunchFailed {
                browser: preference.to_string(),
                reason: "no display".to_string(),
            });
        }
        Ok(())
    }
}

/// Memory store whose refresh token writes always fail.
#[derive(Default)]
pub struct ReadOnlyTokenStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for ReadOnlyTokenStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        if key == StoreKey::RefreshToken {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            )));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: StoreKey) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }
}

/// Memory store that cannot remove the pending authorization.
#[derive(Default)]
pub struct StuckPendingStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for StuckPendingStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: StoreKey) -> Result<(), StoreError> {
        if key == StoreKey::PendingAuthState {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "state directory is read-only",
            )));
        }
        self.inner.delete(key).await
    }
}

/// Memory store that already holds a refresh token from an earlier run.
pub async fn store_with_refresh_token(token: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::RefreshToken, token).await.unwrap();
    store
}

pub fn device(id: &str, name: &str, active: bool) -> Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "type": "Computer",
        "is_active": active,
        "volume_percent": 50,
    })
}

pub fn devices(list: Vec<Value>) -> Value {
    serde_json::json!({ "devices": list })
}
