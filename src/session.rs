//! One entry point per command verb.
//!
//! [`SpotifySession`] wires the token manager, device resolver, playback
//! dispatcher and catalog together and runs every authenticated operation
//! through [`SessionGuard`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    Res,
    browser::BrowserLauncher,
    config::Settings,
    management::{CredentialStore, Credentials, KeyValueStore},
    spotify::{
        auth::{AuthPhase, AuthorizationPrompt, TokenManager, TokenProvider},
        catalog::Catalog,
        client::{ApiClient, build_http_client},
        devices::{DeviceResolver, PollPolicy},
        playback::{ControlOutcome, PlaybackDispatcher, PlaybackOutcome},
        session::SessionGuard,
        target::PlaybackTarget,
    },
    types::{Album, Device, PlaybackState, Playlist, Track},
};

pub struct SpotifySession {
    tokens: Arc<TokenManager>,
    guard: SessionGuard,
    dispatcher: PlaybackDispatcher,
    devices: Arc<DeviceResolver>,
    catalog: Catalog,
}

impl SpotifySession {
    /// Builds a session. Nothing is requested until the first operation.
    pub fn new(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        prompt: Arc<dyn AuthorizationPrompt>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Res<Self> {
        let settings = Arc::new(settings);
        let http = build_http_client(settings.http_timeout)?;

        let credentials = Arc::new(CredentialStore::new(
            Credentials {
                client_id: settings.client_id.clone(),
                client_secret: settings.client_secret.clone(),
            },
            store,
        ));
        let tokens = Arc::new(TokenManager::new(
            http.clone(),
            Arc::clone(&settings),
            credentials,
            prompt,
        ));

        let api = Arc::new(ApiClient::new(http, &settings));
        let devices = Arc::new(DeviceResolver::new(Arc::clone(&api)));
        let poll = PollPolicy {
            max_attempts: settings.device_poll_attempts,
            interval: settings.device_poll_interval,
        };
        let dispatcher = PlaybackDispatcher::new(
            Arc::clone(&api),
            Arc::clone(&devices),
            launcher,
            settings.browser,
            poll,
        );

        Ok(Self {
            guard: SessionGuard::new(Arc::clone(&tokens) as Arc<dyn TokenProvider>),
            tokens,
            dispatcher,
            devices,
            catalog: Catalog::new(api),
        })
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub async fn phase(&self) -> AuthPhase {
        self.tokens.phase().await
    }

    /// Resumes from the stored refresh token or authorizes interactively.
    pub async fn start(&self) -> Res<()> {
        self.tokens.start_session().await?;
        Ok(())
    }

    /// Forces a new interactive authorization.
    pub async fn authorize(&self) -> Res<()> {
        self.tokens.authorize().await?;
        Ok(())
    }

    pub async fn logout(&self) -> Res<()> {
        self.tokens.logout().await?;
        Ok(())
    }

    pub async fn play(
        &self,
        target: &PlaybackTarget,
        cancel: &CancellationToken,
    ) -> Res<PlaybackOutcome> {
        self.guard
            .run(|token| async move { self.dispatcher.play(&token, target, cancel).await })
            .await
    }

    pub async fn toggle_playback(&self) -> Res<ControlOutcome> {
        self.guard
            .run(|token| async move { self.dispatcher.toggle_playback(&token).await })
            .await
    }

    pub async fn set_volume(&self, percent: i64) -> Res<ControlOutcome> {
        self.guard
            .run(|token| async move { self.dispatcher.set_volume(&token, percent).await })
            .await
    }

    pub async fn skip_next(&self) -> Res<ControlOutcome> {
        self.guard
            .run(|token| async move { self.dispatcher.skip_next(&token).await })
            .await
    }

    pub async fn skip_previous(&self) -> Res<ControlOutcome> {
        self.guard
            .run(|token| async move { self.dispatcher.skip_previous(&token).await })
            .await
    }

    pub async fn set_repeat_mode(&self, mode: &str) -> Res<ControlOutcome> {
        self.guard
            .run(|token| async move { self.dispatcher.set_repeat_mode(&token, mode).await })
            .await
    }

    pub async fn toggle_repeat(&self) -> Res<ControlOutcome> {
        self.guard
            .run(|token| async move { self.dispatcher.toggle_repeat(&token).await })
            .await
    }

    pub async fn current_playback(&self) -> Res<Option<PlaybackState>> {
        self.guard
            .run(|token| async move { self.dispatcher.current_playback(&token).await })
            .await
    }

    pub async fn devices(&self) -> Res<Vec<Device>> {
        self.guard
            .run(|token| async move { self.devices.list_devices(&token).await })
            .await
    }

    pub async fn search(&self, query: &str) -> Res<Vec<Track>> {
        self.guard
            .run(|token| async move { self.catalog.search_tracks(&token, query).await })
            .await
    }

    pub async fn new_releases(&self) -> Res<Vec<Album>> {
        self.guard
            .run(|token| async move { self.catalog.new_releases(&token).await })
            .await
    }

    pub async fn playlists(&self) -> Res<Vec<Playlist>> {
        self.guard
            .run(|token| async move { self.catalog.list_playlists(&token).await })
            .await
    }
}
