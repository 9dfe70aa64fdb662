// src/client.rs

//! The outbound HTTP collaborator used for discovery, JWKS and userinfo fetches.

use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// A status code and body returned by an [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs HTTP GETs. Transport failures and timeouts are returned as
/// [`FetchError::Network`]; non-2xx statuses are returned as responses.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError>;

    /// GET with an `Authorization: Bearer` header, used for userinfo.
    async fn get_with_bearer(&self, url: &Url, token: &str) -> Result<HttpResponse, FetchError>;
}

/// The default [`HttpFetcher`], backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestFetcher {
    http_client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with a {:?} timeout, using defaults: {}", timeout, e);
                reqwest::Client::new()
            });
        Self { http_client }
    }

    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, FetchError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    #[instrument(skip_all, fields(url = %url), err)]
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        self.send(self.http_client.get(url.clone())).await
    }

    #[instrument(skip_all, fields(url = %url), err)]
    async fn get_with_bearer(&self, url: &Url, token: &str) -> Result<HttpResponse, FetchError> {
        self.send(self.http_client.get(url.clone()).bearer_auth(token))
            .await
    }
}

/// Checks the status of a fetched response and returns its body.
pub(crate) fn success_body(url: &Url, response: HttpResponse) -> Result<Bytes, FetchError> {
    if !response.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }
    debug!(url = %url, bytes = response.body.len(), "Fetched document");
    Ok(response.body)
}

/// Fetches `url` and deserializes a 2xx JSON body into `T`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn HttpFetcher,
    url: &Url,
    bearer: Option<&str>,
) -> Result<T, FetchError> {
    let response = match bearer {
        Some(token) => fetcher.get_with_bearer(url, token).await?,
        None => fetcher.get(url).await?,
    };
    let body = success_body(url, response)?;
    serde_json::from_slice(&body).map_err(|e| FetchError::parse(url.as_str(), e))
}
