use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Response of the token endpoint for both grant types.
///
/// Every field is optional on the wire; an empty access token is how the
/// provider (or a misbehaving proxy) reports a failed grant in a 200 body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// A pending authorization-code handshake.
///
/// Created by `begin_authorization`, consumed (and deleted) by
/// `complete_authorization` whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationAttempt {
    pub state: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthorizationCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// A playback endpoint registered with the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub is_active: bool,
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceObject {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub is_active: bool,
    pub volume_percent: Option<u8>,
}

impl DeviceObject {
    /// Devices without an id cannot be targeted and are dropped.
    pub fn into_device(self) -> Option<Device> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(Device {
            id,
            name: self.name,
            kind: self.kind,
            is_active: self.is_active,
            volume_percent: self.volume_percent,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<DeviceObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracks {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    pub owner: Option<PlaylistOwner>,
    pub tracks: Option<PlaylistTracks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Page<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReleasesResponse {
    pub albums: Page<Album>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackDevice {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub volume_percent: Option<u8>,
}

/// Response of `GET /me/player`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackState {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub shuffle_state: bool,
    #[serde(default)]
    pub repeat_state: Option<String>,
    pub item: Option<Track>,
    pub device: Option<PlaybackDevice>,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    #[tabled(rename = "#")]
    pub number: usize,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub length: String,
}

#[derive(Tabled)]
pub struct AlbumTableRow {
    #[tabled(rename = "#")]
    pub number: usize,
    pub name: String,
    pub artists: String,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    #[tabled(rename = "#")]
    pub number: usize,
    pub name: String,
    pub owner: String,
    pub tracks: u64,
}

#[derive(Tabled)]
pub struct DeviceTableRow {
    pub name: String,
    #[tabled(rename = "type")]
    pub kind: String,
    pub active: String,
    pub volume: String,
}
