//! # Spotify Integration Module
//!
//! Everything that talks to the Spotify accounts service and Web API.
//!
//! ## Architecture
//!
//! ```text
//! SessionGuard (refresh once, retry once)
//!          ↓
//! PlaybackDispatcher ──→ DeviceResolver
//!     │                       │
//!     ├── browser fallback    │
//!          ↓                  ↓
//!        ApiClient (reqwest, bearer token)
//!          ↓
//!     Spotify Web API
//!
//! TokenManager ──→ AuthorizationPrompt (callback server / pasted URL)
//!     │
//!     └── CredentialStore (in-memory token state, durable refresh token)
//! ```
//!
//! ## Core Modules
//!
//! - [`auth`] - OAuth 2.0 authorization-code flow with client-secret Basic
//!   auth: state nonce, code exchange, single-flight refresh with refresh
//!   token rotation.
//! - [`prompt`] - The interactive half of the flow: a local callback server
//!   or a pasted redirect URL.
//! - [`devices`] - Device listing and the selection policy (active, then
//!   web player, then first), with cancellable polling.
//! - [`playback`] - Play with browser fallback, and the control commands
//!   (toggle, volume, skip, repeat).
//! - [`session`] - [`session::SessionGuard`], the retry policy around every
//!   authenticated call.
//! - [`catalog`] - Search, new releases and playlists.
//! - [`target`] - What to play, and how it maps to request bodies and web
//!   URLs.
//! - [`client`] - The shared HTTP client and Web API wrapper.
//!
//! ## API Coverage
//!
//! - `POST /api/token` - Code exchange and refresh
//! - `GET /me/player` - Current playback state
//! - `GET /me/player/devices` - Available devices
//! - `PUT /me/player/play?device_id=` - Start playback on a device
//! - `PUT /me/player/pause`, `PUT /me/player/play` - Toggle playback
//! - `PUT /me/player/volume?volume_percent=` - Volume
//! - `PUT /me/player/repeat?state=` - Repeat mode
//! - `POST /me/player/next`, `POST /me/player/previous` - Skip
//! - `GET /search`, `GET /browse/new-releases`, `GET /me/playlists` - Catalog

pub mod auth;
pub mod catalog;
pub mod client;
pub mod devices;
pub mod playback;
pub mod prompt;
pub mod session;
pub mod target;
