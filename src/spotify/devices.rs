use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::{
    Res, debug,
    spotify::client::ApiClient,
    types::{Device, DevicesResponse},
    utils,
};

/// How long and how often to look for a device before context playback.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(2),
        }
    }
}

/// Picks the device to play on.
///
/// Priority, in list order within each rule:
/// 1. the first active device
/// 2. the first device whose name contains "web player" (any case)
/// 3. the first device
pub fn select_device(devices: &[Device]) -> Option<&Device> {
    devices
        .iter()
        .find(|d| d.is_active)
        .or_else(|| {
            devices
                .iter()
                .find(|d| d.name.to_lowercase().contains("web player"))
        })
        .or_else(|| devices.first())
}

/// Finds the device a play request should target.
///
/// Nothing is cached: devices come and go between commands, so every
/// resolution starts from a fresh listing and [`select_device`] is applied to
/// that snapshot only.
///
/// # Example
///
/// ```ignore
/// let resolver = DeviceResolver::new(api);
/// match resolver.select(&token).await? {
///     Some(device) => println!("playing on {}", device.name),
///     None => println!("no device, opening the web player"),
/// }
/// ```
pub struct DeviceResolver {
    api: Arc<ApiClient>,
}

impl DeviceResolver {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetches the current device list. An empty list is not an error.
    pub async fn list_devices(&self, token: &str) -> Res<Vec<Device>> {
        let response = self.api.get(token, "/me/player/devices").await?;
        let devices: DevicesResponse = ApiClient::json(response).await?;

        Ok(devices
            .devices
            .into_iter()
            .filter_map(|d| d.into_device())
            .collect())
    }

    /// Lists devices once and applies [`select_device`].
    pub async fn select(&self, token: &str) -> Res<Option<Device>> {
        let devices = self.list_devices(token).await?;
        let device = select_device(&devices).cloned();
        if let Some(device) = &device {
            debug!("Selected device {} ({})", device.name, device.kind);
        }
        Ok(device)
    }

    /// Repeats [`select`](Self::select) until a device shows up, the policy
    /// is exhausted, or `cancel` fires. Cancellation yields `None`.
    ///
    /// Used before album and playlist playback, where a freshly opened web
    /// player may need a few seconds to register.
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer token for the listing requests
    /// * `policy` - Number of listings and the pause between them
    /// * `cancel` - Stops the wait between two listings
    ///
    /// # Errors
    ///
    /// The first listing error ends the polling and is returned as is.
    pub async fn select_with_polling(
        &self,
        token: &str,
        policy: PollPolicy,
        cancel: &CancellationToken,
    ) -> Res<Option<Device>> {
        let pb = ProgressBar::new_spinner();
        pb.set_message("Looking for a playback device...");
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        let result = utils::poll_until(policy.max_attempts, policy.interval, cancel, |attempt| {
            pb.set_message(format!(
                "Looking for a playback device ({}/{})...",
                attempt, policy.max_attempts
            ));
            self.select(token)
        })
        .await;

        pb.finish_and_clear();
        result
    }
}
