use std::sync::Arc;

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::{Mutex, oneshot};

use crate::{debug, types::AuthorizationCallback};

/// Hands the first redirect received to whoever waits on the receiver.
pub type CallbackSender = Arc<Mutex<Option<oneshot::Sender<AuthorizationCallback>>>>;

/// Receives the OAuth redirect.
///
/// Only forwards the query parameters; the state nonce is verified by the
/// token manager, never here.
pub async fn callback(
    Query(params): Query<AuthorizationCallback>,
    Extension(sender): Extension<CallbackSender>,
) -> Html<&'static str> {
    let Some(tx) = sender.lock().await.take() else {
        return Html("<h4>Authorization already received. You can close this window.</h4>");
    };

    let page = match (&params.error, &params.code) {
        (Some(_), _) => Html("<h4>Authorization was denied.</h4>"),
        (None, Some(_)) => {
            Html("<h2>Authorization received.</h2><p>You can close this window.</p>")
        }
        (None, None) => Html("<h4>Missing authorization code.</h4>"),
    };

    if tx.send(params).is_err() {
        debug!("Authorization callback arrived after the prompt gave up");
    }
    page
}
