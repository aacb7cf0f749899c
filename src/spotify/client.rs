use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Res, config::Settings, debug, error::Error};

/// Builds the one HTTP client of the process.
///
/// Every request carries the configured deadline so that a hung endpoint
/// cannot stall the caller.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Thin bearer-authenticated wrapper around the Web API base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: Client, settings: &Settings) -> Self {
        Self {
            http,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, token: &str, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.http.request(method, url).bearer_auth(token)
    }

    pub async fn get(&self, token: &str, path: &str) -> Res<Response> {
        Ok(self.request(Method::GET, token, path).send().await?)
    }

    pub async fn get_query(&self, token: &str, path: &str, query: &[(&str, &str)]) -> Res<Response> {
        Ok(self
            .request(Method::GET, token, path)
            .query(query)
            .send()
            .await?)
    }

    /// `PUT` with an optional JSON body; `None` sends an empty body.
    pub async fn put(&self, token: &str, path: &str, body: Option<&Value>) -> Res<Response> {
        self.put_query(token, path, &[], body).await
    }

    /// `PUT` with URL-encoded query parameters.
    pub async fn put_query(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Res<Response> {
        let request = self.request(Method::PUT, token, path).query(query);
        let request = match body {
            Some(body) => request.json(body),
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };
        Ok(request.send().await?)
    }

    pub async fn post(&self, token: &str, path: &str) -> Res<Response> {
        Ok(self
            .request(Method::POST, token, path)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?)
    }

    /// Decodes a 200 JSON body, anything else becomes [`Error::Api`].
    pub async fn json<T: DeserializeOwned>(response: Response) -> Res<T> {
        let status = response.status();
        if status != StatusCode::OK {
            return Err(api_error(response).await);
        }
        Ok(response.json::<T>().await?)
    }
}

/// Drains the response into an [`Error::Api`] carrying status and body.
pub async fn api_error(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Error::Api { status, body }
}
