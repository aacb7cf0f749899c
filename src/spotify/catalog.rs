use std::sync::Arc;

use crate::{
    Res,
    spotify::client::ApiClient,
    types::{Album, NewReleasesResponse, Page, Playlist, SearchResponse, Track},
};

const SEARCH_LIMIT: &str = "10";
const NEW_RELEASES_LIMIT: &str = "10";
const PLAYLISTS_LIMIT: &str = "20";

/// Read-only catalog lookups used to find something to play.
pub struct Catalog {
    api: Arc<ApiClient>,
}

impl Catalog {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn search_tracks(&self, token: &str, query: &str) -> Res<Vec<Track>> {
        let response = self
            .api
            .get_query(
                token,
                "/search",
                &[("q", query.trim()), ("type", "track"), ("limit", SEARCH_LIMIT)],
            )
            .await?;
        let result: SearchResponse = ApiClient::json(response).await?;
        Ok(result.tracks.items)
    }

    pub async fn new_releases(&self, token: &str) -> Res<Vec<Album>> {
        let response = self
            .api
            .get_query(token, "/browse/new-releases", &[("limit", NEW_RELEASES_LIMIT)])
            .await?;
        let result: NewReleasesResponse = ApiClient::json(response).await?;
        Ok(result.albums.items)
    }

    /// Playlists owned or followed by the current user.
    pub async fn list_playlists(&self, token: &str) -> Res<Vec<Playlist>> {
        let response = self
            .api
            .get_query(token, "/me/playlists", &[("limit", PLAYLISTS_LIMIT)])
            .await?;
        let result: Page<Playlist> = ApiClient::json(response).await?;
        Ok(result.items)
    }
}
