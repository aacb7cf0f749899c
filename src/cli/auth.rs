use crate::{Res, info, session::SpotifySession, success};

/// Runs a fresh authorization, replacing any stored session.
pub async fn auth(session: &SpotifySession) -> Res<()> {
    info!("Starting authorization with Spotify...");
    session.authorize().await?;
    success!("Authenticated with Spotify.");
    Ok(())
}

pub async fn logout(session: &SpotifySession) -> Res<()> {
    session.logout().await?;
    success!("Logged out. The saved refresh token was removed.");
    Ok(())
}
