use tabled::Table;

use crate::{
    Res,
    error::DeviceError,
    info,
    session::SpotifySession,
    types::{
        Album, AlbumTableRow, Artist, Device, DeviceTableRow, Playlist, PlaylistTableRow, Track,
        TrackTableRow,
    },
    utils,
};

pub async fn search(session: &SpotifySession, query: &str) -> Res<Vec<Track>> {
    let tracks = session.search(query).await?;
    if tracks.is_empty() {
        info!("No tracks found for \"{}\"", query.trim());
    } else {
        println!("{}", tracks_table(&tracks));
    }
    Ok(tracks)
}

pub async fn new_releases(session: &SpotifySession) -> Res<Vec<Album>> {
    let albums = session.new_releases().await?;
    if albums.is_empty() {
        info!("No new releases");
    } else {
        println!("{}", albums_table(&albums));
    }
    Ok(albums)
}

pub async fn playlists(session: &SpotifySession) -> Res<Vec<Playlist>> {
    let playlists = session.playlists().await?;
    if playlists.is_empty() {
        info!("You have no playlists");
    } else {
        println!("{}", playlists_table(&playlists));
    }
    Ok(playlists)
}

pub async fn devices(session: &SpotifySession) -> Res<()> {
    let devices = session.devices().await?;
    if devices.is_empty() {
        info!("Open Spotify on one of your devices and try again.");
        return Err(DeviceError::NoDevicesAvailable.into());
    }
    println!("{}", devices_table(&devices));
    Ok(())
}

pub fn artist_names(artists: &[Artist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn tracks_table(tracks: &[Track]) -> Table {
    let rows: Vec<TrackTableRow> = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| TrackTableRow {
            number: i + 1,
            name: utils::truncate(&t.name, 40),
            artists: utils::truncate(&artist_names(&t.artists), 30),
            album: t
                .album
                .as_ref()
                .map(|a| utils::truncate(&a.name, 30))
                .unwrap_or_default(),
            length: utils::format_duration_ms(t.duration_ms),
        })
        .collect();
    Table::new(rows)
}

fn albums_table(albums: &[Album]) -> Table {
    let rows: Vec<AlbumTableRow> = albums
        .iter()
        .enumerate()
        .map(|(i, a)| AlbumTableRow {
            number: i + 1,
            name: utils::truncate(&a.name, 40),
            artists: utils::truncate(&artist_names(&a.artists), 30),
        })
        .collect();
    Table::new(rows)
}

fn playlists_table(playlists: &[Playlist]) -> Table {
    let rows: Vec<PlaylistTableRow> = playlists
        .iter()
        .enumerate()
        .map(|(i, p)| PlaylistTableRow {
            number: i + 1,
            name: utils::truncate(&p.name, 40),
            owner: p
                .owner
                .as_ref()
                .and_then(|o| o.display_name.clone())
                .unwrap_or_default(),
            tracks: p.tracks.as_ref().map(|t| t.total).unwrap_or_default(),
        })
        .collect();
    Table::new(rows)
}

fn devices_table(devices: &[Device]) -> Table {
    let rows: Vec<DeviceTableRow> = devices
        .iter()
        .map(|d| DeviceTableRow {
            name: d.name.clone(),
            kind: d.kind.clone(),
            active: if d.is_active { "yes" } else { "" }.to_string(),
            volume: d
                .volume_percent
                .map(|v| format!("{}%", v))
                .unwrap_or_default(),
        })
        .collect();
    Table::new(rows)
}
