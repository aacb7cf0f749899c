use std::{future::Future, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::{Rng, SeedableRng, TryRngCore, distr::Alphanumeric, rngs::OsRng, rngs::StdRng};
use tokio_util::sync::CancellationToken;

/// Bytes of OS entropy in a state nonce.
pub const STATE_NONCE_BYTES: usize = 24;

/// Generates a state nonce from the operating system's secure RNG.
///
/// Returns the base64url (unpadded) encoding of [`STATE_NONCE_BYTES`] random
/// bytes, or the RNG error message if the OS source is unavailable.
pub fn generate_state_nonce() -> Result<String, String> {
    let mut bytes = [0u8; STATE_NONCE_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| e.to_string())?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Time-seeded alphanumeric nonce.
///
/// Predictable to anyone who can guess the clock, which weakens the CSRF
/// protection of the state parameter. Only used when explicitly allowed.
pub fn fallback_state_nonce(length: usize) -> String {
    let seed = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros()) as u64;
    StdRng::seed_from_u64(seed)
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Converts `spotify:kind:id` into `https://open.spotify.com/kind/id`.
///
/// Returns `None` unless the URI has exactly three non-empty parts.
pub fn uri_to_web_url(uri: &str) -> Option<String> {
    let parts: Vec<&str> = uri.split(':').collect();
    match parts.as_slice() {
        [provider, kind, id] if !provider.is_empty() && !kind.is_empty() && !id.is_empty() => {
            Some(format!("https://open.{provider}.com/{kind}/{id}"))
        }
        _ => None,
    }
}

/// Formats a millisecond duration as `M:SS`.
pub fn format_duration_ms(ms: u64) -> String {
    format!("{}:{:02}", ms / 60_000, (ms / 1000) % 60)
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Repeats `probe` until it yields a value, at most `attempts` times.
///
/// Sleeps `interval` between attempts (not after the last one). Returns
/// `Ok(None)` when attempts are exhausted or `cancel` fires, whichever
/// comes first; an error from `probe` ends polling immediately.
pub async fn poll_until<T, E, F, Fut>(
    attempts: u32,
    interval: Duration,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<Option<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            outcome = probe(attempt) => outcome?,
        };
        if let Some(value) = outcome {
            return Ok(Some(value));
        }

        if attempt < attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    Ok(None)
}
