use std::{fmt, str::FromStr};

use serde_json::{Value, json};

use crate::{error::PlaybackError, utils};

const PROVIDER: &str = "spotify";

/// What to play: a single item or an ordered context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackTarget {
    Track(String),
    Album(String),
    Playlist(String),
}

impl PlaybackTarget {
    /// Parses a `spotify:kind:id` URI.
    pub fn parse(uri: &str) -> Result<Self, PlaybackError> {
        let uri = uri.trim();
        let parts: Vec<&str> = uri.split(':').collect();
        let [provider, kind, id] = parts.as_slice() else {
            return Err(PlaybackError::InvalidTarget(uri.to_string()));
        };
        if *provider != PROVIDER || id.is_empty() {
            return Err(PlaybackError::InvalidTarget(uri.to_string()));
        }

        match *kind {
            "track" => Ok(Self::Track(uri.to_string())),
            "album" => Ok(Self::Album(uri.to_string())),
            "playlist" => Ok(Self::Playlist(uri.to_string())),
            _ => Err(PlaybackError::InvalidTarget(uri.to_string())),
        }
    }

    /// Accepts a bare track id or a full track URI.
    pub fn track(id_or_uri: &str) -> Self {
        Self::Track(with_prefix("track", id_or_uri))
    }

    /// Accepts a bare album id or a full album URI.
    pub fn album(id_or_uri: &str) -> Self {
        Self::Album(with_prefix("album", id_or_uri))
    }

    /// Accepts a bare playlist id or a full playlist URI.
    pub fn playlist(id_or_uri: &str) -> Self {
        Self::Playlist(with_prefix("playlist", id_or_uri))
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::Track(uri) | Self::Album(uri) | Self::Playlist(uri) => uri,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Track(_) => "track",
            Self::Album(_) => "album",
            Self::Playlist(_) => "playlist",
        }
    }

    /// Albums and playlists are played as a context.
    pub fn is_context(&self) -> bool {
        !matches!(self, Self::Track(_))
    }

    /// Body of `PUT /me/player/play`.
    pub fn play_body(&self) -> Value {
        match self {
            Self::Track(uri) => json!({ "uris": [uri] }),
            Self::Album(uri) | Self::Playlist(uri) => json!({ "context_uri": uri }),
        }
    }

    /// Web player URL of the target.
    pub fn web_url(&self) -> Result<String, PlaybackError> {
        utils::uri_to_web_url(self.uri())
            .ok_or_else(|| PlaybackError::InvalidTarget(self.uri().to_string()))
    }
}

impl FromStr for PlaybackTarget {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PlaybackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

fn with_prefix(kind: &str, id_or_uri: &str) -> String {
    let prefix = format!("{PROVIDER}:{kind}:");
    let id_or_uri = id_or_uri.trim();
    if id_or_uri.starts_with(&prefix) {
        id_or_uri.to_string()
    } else {
        format!("{prefix}{id_or_uri}")
    }
}
