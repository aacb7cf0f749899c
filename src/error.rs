//! Error taxonomy for the session and playback layer.
//!
//! Authorization failures are the only class recovered automatically (see
//! [`crate::spotify::session::SessionGuard`]); every other variant reaches the
//! caller unchanged so it can render a diagnostic.

use reqwest::StatusCode;
use thiserror::Error;

use crate::management::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set")]
    MissingCredentials,

    #[error(
        "state mismatch, possible CSRF attack. Start the authorization again from the beginning"
    )]
    StateMismatch,

    #[error("no pending authorization found (expired or already used). Start the authorization again")]
    FlowExpired,

    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("authorization was not granted: {0}")]
    Denied(String),

    #[error("authorization was not completed: {0}")]
    Incomplete(String),

    #[error("secure random source unavailable: {0}")]
    EntropyUnavailable(String),
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no playback devices available")]
    NoDevicesAvailable,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("play request failed with status {status}: {body}")]
    ApiRejected { status: StatusCode, body: String },

    #[error("invalid playback target: {0}")]
    InvalidTarget(String),
}

#[derive(Debug, Error)]
pub enum BrowserFallbackError {
    #[error("failed to open {browser}: {reason}")]
    LaunchFailed { browser: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid repeat mode: {0}. Valid modes are: off, track, song, context, album, playlist")]
    InvalidRepeatMode(String),

    #[error("volume must be between 0 and 100, got {0}")]
    InvalidVolume(i64),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Browser(#[from] BrowserFallbackError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("request failed with status {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("not authenticated, no access token available")]
    NoToken,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{source} (reauthorization required: {refresh})")]
    ReauthorizationRequired {
        source: Box<Error>,
        refresh: AuthError,
    },
}

impl Error {
    /// Whether a token refresh could plausibly fix this failure.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Error::NoToken => true,
            Error::Api { status, .. } => is_auth_status(*status),
            Error::Playback(PlaybackError::ApiRejected { status, .. }) => is_auth_status(*status),
            _ => false,
        }
    }

    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Error::ReauthorizationRequired { .. })
    }
}

fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
