use axum::{Extension, Router, routing::get};
use std::{io, net::SocketAddr, str::FromStr};
use tokio_util::sync::CancellationToken;

use crate::api::{self, CallbackSender};

/// Path component of the redirect URI, `/callback` if it has none.
pub fn callback_path(redirect_uri: &str) -> String {
    reqwest::Url::parse(redirect_uri)
        .ok()
        .map(|url| url.path().to_string())
        .filter(|path| path.len() > 1)
        .unwrap_or_else(|| "/callback".to_string())
}

/// Serves the callback and health endpoints until `shutdown` is cancelled.
pub async fn start_api_server(
    addr: String,
    callback_path: String,
    sender: CallbackSender,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let app = Router::new()
        .route("/health", get(api::health))
        .route(&callback_path, get(api::callback).layer(Extension(sender)));

    let addr = SocketAddr::from_str(&addr).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("failed to parse server address {}: {}", addr, e),
        )
    })?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
