use std::{io::Write, sync::Arc, time::Duration};

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{Mutex, oneshot},
};
use tokio_util::sync::CancellationToken;

use crate::{
    browser::{BrowserLauncher, BrowserPreference},
    config::Settings,
    error::AuthError,
    info,
    server::{self, start_api_server},
    spotify::auth::AuthorizationPrompt,
    types::AuthorizationCallback,
    warning,
};

/// Opens the authorization page in a browser and catches the redirect with
/// the local callback server.
pub struct CallbackServerPrompt {
    server_addr: String,
    callback_path: String,
    browser: BrowserPreference,
    launcher: Arc<dyn BrowserLauncher>,
    timeout: Duration,
}

impl CallbackServerPrompt {
    pub fn new(settings: &Settings, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            server_addr: settings.server_addr.clone(),
            callback_path: server::callback_path(&settings.redirect_uri),
            browser: settings.browser,
            launcher,
            timeout: settings.auth_timeout,
        }
    }
}

#[async_trait]
impl AuthorizationPrompt for CallbackServerPrompt {
    async fn authorize(
        &self,
        authorization_url: &str,
    ) -> Result<AuthorizationCallback, AuthError> {
        let (tx, rx) = oneshot::channel();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let shutdown = CancellationToken::new();

        let server = tokio::spawn(start_api_server(
            self.server_addr.clone(),
            self.callback_path.clone(),
            sender,
            shutdown.clone(),
        ));

        if self.launcher.open(authorization_url, self.browser).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                authorization_url
            );
        } else {
            info!("Opened the Spotify authorization page in your browser.");
        }

        let pb = ProgressBar::new_spinner();
        pb.set_message("Waiting for authorization...");
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        let received = tokio::time::timeout(self.timeout, rx).await;
        pb.finish_and_clear();
        shutdown.cancel();

        match received {
            Ok(Ok(callback)) => Ok(callback),
            Ok(Err(_)) => {
                // The sender only drops early when the server task ended.
                let reason = match server.await {
                    Ok(Err(e)) => format!("callback server failed: {}", e),
                    Ok(Ok(())) => "callback server stopped".to_string(),
                    Err(e) => format!("callback server task failed: {}", e),
                };
                Err(AuthError::Incomplete(reason))
            }
            Err(_) => Err(AuthError::Incomplete(format!(
                "timed out after {}s waiting for the redirect",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Prints the authorization URL and reads the redirect from stdin.
///
/// Accepts either the full redirected URL or `manual`, followed by the code
/// and the state on separate lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct PastedRedirectPrompt;

#[async_trait]
impl AuthorizationPrompt for PastedRedirectPrompt {
    async fn authorize(
        &self,
        authorization_url: &str,
    ) -> Result<AuthorizationCallback, AuthError> {
        println!(
            "Please open the following URL in your browser:\n{}",
            authorization_url
        );
        println!("After authorizing, you will be redirected to a URL.");
        println!("Option 1: Paste the full redirect URL here");
        println!("Option 2: Type 'manual' to enter the authorization code and state manually");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let input = read_line(&mut lines, "Enter your choice: ").await?;

        if input.starts_with("manual") {
            let code = read_line(&mut lines, "Authorization code: ").await?;
            let state = read_line(&mut lines, "State parameter: ").await?;
            return Ok(AuthorizationCallback {
                code: Some(code),
                state: Some(state),
                error: None,
            });
        }

        parse_redirect_url(&input)
    }
}

/// Extracts `code`, `state` and `error` from a redirected URL.
pub fn parse_redirect_url(input: &str) -> Result<AuthorizationCallback, AuthError> {
    let url = Url::parse(input.trim())
        .map_err(|e| AuthError::Incomplete(format!("error parsing redirected URL: {}", e)))?;

    let mut callback = AuthorizationCallback::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => callback.code = Some(value.into_owned()),
            "state" => callback.state = Some(value.into_owned()),
            "error" => callback.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(callback)
}

async fn read_line<R>(
    lines: &mut tokio::io::Lines<BufReader<R>>,
    prompt: &str,
) -> Result<String, AuthError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    print!("{}", prompt);
    let _ = std::io::stdout().flush();

    match lines.next_line().await {
        Ok(Some(line)) => Ok(line.trim().to_string()),
        Ok(None) => Err(AuthError::Incomplete("input closed".to_string())),
        Err(e) => Err(AuthError::Incomplete(format!("error reading input: {}", e))),
    }
}
