//! Playback dispatch against a resolved device, with browser fallback.
//!
//! `play` is the only operation with a fallback: when no device can be
//! found, or the provider refuses the play request, the target is opened in
//! the web player instead. The control operations (toggle, volume, skip,
//! repeat) presuppose a running session and report "no active device"
//! rather than falling back.

use std::{fmt, str::FromStr, sync::Arc};

use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::{
    Res,
    browser::{BrowserLauncher, BrowserPreference},
    debug,
    error::{BrowserFallbackError, Error, PlaybackError, ValidationError},
    info,
    spotify::{
        client::{ApiClient, api_error},
        devices::{DeviceResolver, PollPolicy},
        target::PlaybackTarget,
    },
    types::PlaybackState,
    warning,
};

/// How a play request ended.
#[derive(Debug)]
pub enum PlaybackOutcome {
    /// Accepted by the provider for the device with this id.
    PlayedOnDevice(String),
    PlayedViaBrowser,
    /// No device path and the browser could not be opened either.
    Failed(BrowserFallbackError),
}

/// Repeat state as the player endpoint names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    Track,
    Context,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::Track => "track",
            RepeatMode::Context => "context",
        }
    }

    /// `off -> track -> context -> off`.
    pub fn next(&self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Context,
            RepeatMode::Context => RepeatMode::Off,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            RepeatMode::Off => "Songs will play in sequence without repeating",
            RepeatMode::Track => "Current song will repeat continuously",
            RepeatMode::Context => "Current playlist or album will repeat after finishing",
        }
    }
}

impl FromStr for RepeatMode {
    type Err = ValidationError;

    /// Accepts `song` for `track`, and `album`/`playlist` for `context`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(RepeatMode::Off),
            "track" | "song" => Ok(RepeatMode::Track),
            "context" | "album" | "playlist" => Ok(RepeatMode::Context),
            _ => Err(ValidationError::InvalidRepeatMode(s.trim().to_string())),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    Next,
    Previous,
}

/// Result of a control command that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    Paused,
    Resumed,
    VolumeSet(u8),
    Skipped(SkipDirection),
    RepeatSet {
        previous: Option<RepeatMode>,
        current: RepeatMode,
    },
    NoActiveDevice,
}

/// Executes playback intents against the Web API.
///
/// # Play pipeline
///
/// 1. **Resolve**: pick a device, polling first for album and playlist
///    targets
/// 2. **Dispatch**: `PUT /me/player/play` scoped to the device, with
///    `{"uris": [..]}` for a track or `{"context_uri": ..}` for a context
/// 3. **Fallback**: without a device, or when the provider refuses the
///    request, open the target's web URL with the configured browser
///
/// # Control commands
///
/// Toggle, volume, skip and repeat issue one mutating call, reading the
/// player state first where the next value depends on it. They have no
/// fallback; a missing device becomes [`ControlOutcome::NoActiveDevice`].
///
/// # Example
///
/// ```ignore
/// let dispatcher = PlaybackDispatcher::new(api, devices, launcher, browser, poll);
/// let outcome = dispatcher
///     .play(&token, &PlaybackTarget::album("4aawyAB9vmqN3uQ7FjRGTy"), &cancel)
///     .await?;
/// ```
pub struct PlaybackDispatcher {
    api: Arc<ApiClient>,
    devices: Arc<DeviceResolver>,
    launcher: Arc<dyn BrowserLauncher>,
    browser: BrowserPreference,
    poll: PollPolicy,
}

impl PlaybackDispatcher {
    pub fn new(
        api: Arc<ApiClient>,
        devices: Arc<DeviceResolver>,
        launcher: Arc<dyn BrowserLauncher>,
        browser: BrowserPreference,
        poll: PollPolicy,
    ) -> Self {
        Self {
            api,
            devices,
            launcher,
            browser,
            poll,
        }
    }

    /// Plays `target` on the best available device, or in the web player.
    ///
    /// # Errors
    ///
    /// Authorization failures (device listing rejected, or `401` on the play
    /// request) are returned as errors so the caller can refresh and retry.
    /// Every other failure of the device path ends in the browser fallback.
    pub async fn play(
        &self,
        token: &str,
        target: &PlaybackTarget,
        cancel: &CancellationToken,
    ) -> Res<PlaybackOutcome> {
        let device = if target.is_context() {
            self.devices
                .select_with_polling(token, self.poll, cancel)
                .await
        } else {
            self.devices.select(token).await
        };

        let device = match device {
            Ok(device) => device,
            Err(e) if e.is_auth_failure() => return Err(e),
            Err(e) => {
                warning!("Could not list devices: {}", e);
                None
            }
        };

        let Some(device) = device else {
            info!("No playback device found, falling back to browser playback...");
            return Ok(self.play_in_browser(target));
        };

        match self.play_on_device(token, target, &device.id).await {
            Ok(()) => {
                info!("Playing {} on {}", target.kind(), device.name);
                Ok(PlaybackOutcome::PlayedOnDevice(device.id))
            }
            // A 403 here usually means a non-premium account, which the
            // browser can still serve; only an expired token is retried.
            Err(e) if is_unauthorized(&e) => Err(e),
            Err(e) => {
                warning!("API playback failed: {}", e);
                info!("Falling back to browser playback...");
                Ok(self.play_in_browser(target))
            }
        }
    }

    async fn play_on_device(
        &self,
        token: &str,
        target: &PlaybackTarget,
        device_id: &str,
    ) -> Res<()> {
        let response = self
            .api
            .put_query(
                token,
                "/me/player/play",
                &[("device_id", device_id)],
                Some(&target.play_body()),
            )
            .await?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PlaybackError::ApiRejected { status, body }.into())
    }

    fn play_in_browser(&self, target: &PlaybackTarget) -> PlaybackOutcome {
        let url = match target.web_url() {
            Ok(url) => url,
            Err(e) => {
                return PlaybackOutcome::Failed(BrowserFallbackError::LaunchFailed {
                    browser: self.browser.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        info!("Opening {} in {}...", url, self.browser);
        match self.launcher.open(&url, self.browser) {
            Ok(()) => PlaybackOutcome::PlayedViaBrowser,
            Err(e) => PlaybackOutcome::Failed(e),
        }
    }

    /// Current player state, `None` when nothing is active.
    pub async fn current_playback(&self, token: &str) -> Res<Option<PlaybackState>> {
        let response = self.api.get(token, "/me/player").await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(ApiClient::json(response).await?))
    }

    /// Pauses when playing, resumes otherwise.
    pub async fn toggle_playback(&self, token: &str) -> Res<ControlOutcome> {
        let Some(state) = self.current_playback(token).await? else {
            return Ok(ControlOutcome::NoActiveDevice);
        };

        let (endpoint, outcome) = if state.is_playing {
            ("/me/player/pause", ControlOutcome::Paused)
        } else {
            ("/me/player/play", ControlOutcome::Resumed)
        };
        self.control(self.api.put(token, endpoint, None).await?, outcome)
            .await
    }

    /// Sets the volume of the active device.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidVolume`] for values outside `0..=100`,
    /// before any request is made.
    pub async fn set_volume(&self, token: &str, percent: i64) -> Res<ControlOutcome> {
        let volume = validate_volume(percent)?;
        let volume_percent = volume.to_string();
        self.control(
            self.api
                .put_query(
                    token,
                    "/me/player/volume",
                    &[("volume_percent", volume_percent.as_str())],
                    None,
                )
                .await?,
            ControlOutcome::VolumeSet(volume),
        )
        .await
    }

    pub async fn skip_next(&self, token: &str) -> Res<ControlOutcome> {
        self.control(
            self.api.post(token, "/me/player/next").await?,
            ControlOutcome::Skipped(SkipDirection::Next),
        )
        .await
    }

    pub async fn skip_previous(&self, token: &str) -> Res<ControlOutcome> {
        self.control(
            self.api.post(token, "/me/player/previous").await?,
            ControlOutcome::Skipped(SkipDirection::Previous),
        )
        .await
    }

    /// Sets the repeat mode; `mode` is validated before any request.
    pub async fn set_repeat_mode(&self, token: &str, mode: &str) -> Res<ControlOutcome> {
        let mode: RepeatMode = mode.parse()?;
        self.put_repeat(token, None, mode).await
    }

    /// Advances the repeat mode one step along its cycle.
    pub async fn toggle_repeat(&self, token: &str) -> Res<ControlOutcome> {
        let Some(state) = self.current_playback(token).await? else {
            return Ok(ControlOutcome::NoActiveDevice);
        };

        let current = state
            .repeat_state
            .as_deref()
            .and_then(|s| s.parse::<RepeatMode>().ok());
        let next = current.map(|m| m.next()).unwrap_or(RepeatMode::Off);
        debug!("Repeat mode {:?} -> {}", current, next);
        self.put_repeat(token, current, next).await
    }

    async fn put_repeat(
        &self,
        token: &str,
        previous: Option<RepeatMode>,
        mode: RepeatMode,
    ) -> Res<ControlOutcome> {
        self.control(
            self.api
                .put_query(token, "/me/player/repeat", &[("state", mode.as_str())], None)
                .await?,
            ControlOutcome::RepeatSet {
                previous,
                current: mode,
            },
        )
        .await
    }

    /// Maps a control response: any 2xx is `outcome`, `404` means no active
    /// device, everything else is an API error.
    async fn control(
        &self,
        response: reqwest::Response,
        outcome: ControlOutcome,
    ) -> Res<ControlOutcome> {
        let status = response.status();
        if status.is_success() {
            return Ok(outcome);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(ControlOutcome::NoActiveDevice);
        }
        Err(api_error(response).await)
    }
}

fn is_unauthorized(e: &Error) -> bool {
    matches!(
        e,
        Error::Playback(PlaybackError::ApiRejected { status, .. }) if *status == StatusCode::UNAUTHORIZED
    )
}

/// Volume must be within `0..=100`.
pub fn validate_volume(percent: i64) -> Result<u8, ValidationError> {
    u8::try_from(percent)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or(ValidationError::InvalidVolume(percent))
}
