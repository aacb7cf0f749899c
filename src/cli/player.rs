use tokio_util::sync::CancellationToken;

use crate::{
    Res,
    cli::catalog::artist_names,
    info,
    session::SpotifySession,
    spotify::{
        playback::{ControlOutcome, PlaybackOutcome, SkipDirection},
        target::PlaybackTarget,
    },
    success, utils, warning,
};

pub async fn play(
    session: &SpotifySession,
    target: &PlaybackTarget,
    cancel: &CancellationToken,
) -> Res<()> {
    match session.play(target, cancel).await? {
        PlaybackOutcome::PlayedOnDevice(_) => success!("Playback started."),
        PlaybackOutcome::PlayedViaBrowser => success!("Opened {} in the web player.", target),
        PlaybackOutcome::Failed(e) => {
            warning!("{}", e);
            if let Ok(url) = target.web_url() {
                info!("Open {} manually to listen.", url);
            }
        }
    }
    Ok(())
}

pub async fn toggle(session: &SpotifySession) -> Res<()> {
    report(session.toggle_playback().await?);
    Ok(())
}

pub async fn volume(session: &SpotifySession, percent: i64) -> Res<()> {
    report(session.set_volume(percent).await?);
    Ok(())
}

pub async fn next(session: &SpotifySession) -> Res<()> {
    report(session.skip_next().await?);
    Ok(())
}

pub async fn previous(session: &SpotifySession) -> Res<()> {
    report(session.skip_previous().await?);
    Ok(())
}

pub async fn repeat(session: &SpotifySession) -> Res<()> {
    report(session.toggle_repeat().await?);
    Ok(())
}

pub async fn repeat_mode(session: &SpotifySession, mode: &str) -> Res<()> {
    report(session.set_repeat_mode(mode).await?);
    Ok(())
}

pub async fn current(session: &SpotifySession) -> Res<()> {
    let Some(state) = session.current_playback().await? else {
        info!("Nothing is playing right now.");
        return Ok(());
    };

    let Some(track) = state.item else {
        info!("No track information available.");
        return Ok(());
    };

    let status = if state.is_playing { "Playing" } else { "Paused" };
    println!("{}: {} - {}", status, track.name, artist_names(&track.artists));
    if let Some(album) = &track.album {
        println!("Album: {}", album.name);
    }
    println!(
        "Progress: {} / {}",
        utils::format_duration_ms(state.progress_ms.unwrap_or_default()),
        utils::format_duration_ms(track.duration_ms)
    );
    if let Some(device) = &state.device {
        println!("Device: {} ({})", device.name, device.kind);
    }
    if let Some(repeat) = &state.repeat_state {
        println!("Repeat: {}", repeat);
    }
    Ok(())
}

fn report(outcome: ControlOutcome) {
    match outcome {
        ControlOutcome::Paused => success!("Playback paused."),
        ControlOutcome::Resumed => success!("Playback resumed."),
        ControlOutcome::VolumeSet(v) => success!("Volume set to {}%.", v),
        ControlOutcome::Skipped(SkipDirection::Next) => success!("Skipped to next track."),
        ControlOutcome::Skipped(SkipDirection::Previous) => {
            success!("Went back to previous track.")
        }
        ControlOutcome::RepeatSet { previous, current } => {
            match previous {
                Some(previous) => success!("Repeat mode changed from {} to {}.", previous, current),
                None => success!("Repeat mode set to {}.", current),
            }
            info!("{}", current.describe());
        }
        ControlOutcome::NoActiveDevice => warning!(
            "No active device found. Start playing something on one of your devices first."
        ),
    }
}
