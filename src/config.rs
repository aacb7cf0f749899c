//! Configuration management for the playback client.
//!
//! Settings are read from environment variables, which may be provided by a
//! `.env` file in the working directory or in the local data directory under
//! `spotctl/.env`. Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `./.env`
//! 3. `<data_local_dir>/spotctl/.env`
//! 4. Application defaults (where applicable)
//!
//! Client credentials have no default; their absence is reported as
//! [`AuthError::MissingCredentials`].

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{browser::BrowserPreference, debug, error::AuthError, warning};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8888/callback";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

/// Loads environment variables from `.env` files.
///
/// Both files are optional. A file that exists but cannot be parsed is
/// reported as a warning; variables already present in the process
/// environment are never overwritten.
///
/// # Directory Structure
///
/// The second file is looked up in:
/// - Linux: `~/.local/share/spotctl/.env`
/// - macOS: `~/Library/Application Support/spotctl/.env`
/// - Windows: `%LOCALAPPDATA%/spotctl/.env`
pub async fn load_env() {
    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            warning!("Cannot parse ./.env: {}", e);
        }
    }

    let path = data_dir().join(".env");
    if let Err(e) = dotenv::from_path(&path) {
        if e.not_found() {
            debug!("No env file at {}", path.display());
        } else {
            warning!("Cannot parse {}: {}", path.display(), e);
        }
    }
}

/// Returns the platform-specific data directory of the application.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotctl");
    path
}

/// Runtime settings of the client.
///
/// Endpoints are configurable so that the whole stack can be pointed at a
/// local stand-in of the provider.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub server_addr: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub browser: BrowserPreference,
    pub http_timeout: Duration,
    pub device_poll_attempts: u32,
    pub device_poll_interval: Duration,
    pub auth_timeout: Duration,
    pub pending_auth_ttl: Duration,
    pub refresh_margin: Duration,
    pub allow_weak_state: bool,
    pub state_dir: PathBuf,
}

impl Settings {
    /// Settings with provider defaults for the given client identity.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            server_addr: DEFAULT_SERVER_ADDRESS.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            browser: BrowserPreference::Default,
            http_timeout: Duration::from_secs(10),
            device_poll_attempts: 5,
            device_poll_interval: Duration::from_secs(2),
            auth_timeout: Duration::from_secs(120),
            pending_auth_ttl: Duration::from_secs(10 * 60),
            refresh_margin: Duration::from_secs(60),
            allow_weak_state: false,
            state_dir: data_dir().join("state"),
        }
    }

    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if `SPOTIFY_CLIENT_ID` or
    /// `SPOTIFY_CLIENT_SECRET` is unset or empty.
    pub fn from_env() -> Result<Self, AuthError> {
        let client_id = non_empty_var("SPOTIFY_CLIENT_ID").ok_or(AuthError::MissingCredentials)?;
        let client_secret =
            non_empty_var("SPOTIFY_CLIENT_SECRET").ok_or(AuthError::MissingCredentials)?;

        let defaults = Self::new(client_id, client_secret);
        Ok(Self {
            redirect_uri: var_or("SPOTIFY_REDIRECT_URI", defaults.redirect_uri.clone()),
            server_addr: var_or("SERVER_ADDRESS", defaults.server_addr.clone()),
            auth_url: var_or("SPOTIFY_API_AUTH_URL", defaults.auth_url.clone()),
            token_url: var_or("SPOTIFY_API_TOKEN_URL", defaults.token_url.clone()),
            api_url: var_or("SPOTIFY_API_URL", defaults.api_url.clone()),
            browser: parsed_var("SPOTIFY_PREFERRED_BROWSER").unwrap_or(defaults.browser),
            http_timeout: secs_var("SPOTIFY_HTTP_TIMEOUT_SECS").unwrap_or(defaults.http_timeout),
            device_poll_attempts: parsed_var("SPOTIFY_DEVICE_POLL_ATTEMPTS")
                .unwrap_or(defaults.device_poll_attempts),
            device_poll_interval: secs_var("SPOTIFY_DEVICE_POLL_INTERVAL_SECS")
                .unwrap_or(defaults.device_poll_interval),
            auth_timeout: secs_var("SPOTIFY_AUTH_TIMEOUT_SECS").unwrap_or(defaults.auth_timeout),
            allow_weak_state: non_empty_var("SPOTCTL_ALLOW_WEAK_STATE")
                .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes")),
            ..defaults
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn var_or(key: &str, default: String) -> String {
    non_empty_var(key).unwrap_or(default)
}

fn parsed_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = non_empty_var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warning!("Ignoring invalid value for {}: {}", key, raw);
            None
        }
    }
}

fn secs_var(key: &str) -> Option<Duration> {
    parsed_var::<u64>(key).map(Duration::from_secs)
}
