//! Remote data: the top-artists endpoint and avatar image bytes.

use crate::config::TOP_ARTISTS_ENDPOINT;
use crate::{RawArtist, TimeRange};
use gloo_net::http::Request;
use log::debug;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx status; `message` is the endpoint's own error when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// The body was not the expected JSON shape.
    #[error("Received unexpected data format.")]
    Malformed(String),
}

impl FetchError {
    /// Build the error for a non-success response, preferring the `error`
    /// field of a JSON body over a generic status message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP error {}", status));
        FetchError::Status { status, message }
    }
}

/// Parse the endpoint body; anything but a JSON array is malformed.
pub fn parse_artist_payload(body: &str) -> Result<Vec<RawArtist>, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    if !value.is_array() {
        return Err(FetchError::Malformed("expected a JSON array".to_string()));
    }
    serde_json::from_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Where the artist list comes from.
#[allow(async_fn_in_trait)]
pub trait ArtistSource: 'static {
    async fn top_artists(&self, range: TimeRange) -> Result<Vec<RawArtist>, FetchError>;
}

/// Where avatar bytes come from.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher: 'static {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// `GET /top-artists?time_range=...` against the page's own origin.
#[derive(Debug, Clone)]
pub struct HttpArtistSource {
    endpoint: String,
}

impl Default for HttpArtistSource {
    fn default() -> Self {
        Self::new(TOP_ARTISTS_ENDPOINT)
    }
}

impl HttpArtistSource {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }

    pub fn url_for(&self, range: TimeRange) -> String {
        format!("{}?time_range={}", self.endpoint, range.as_query())
    }
}

impl ArtistSource for HttpArtistSource {
    async fn top_artists(&self, range: TimeRange) -> Result<Vec<RawArtist>, FetchError> {
        let url = self.url_for(range);
        debug!("GET {}", url);
        let resp = Request::get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if !resp.ok() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::from_status(resp.status(), &body));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        parse_artist_payload(&body)
    }
}

/// Plain `GET` for avatar images.
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher;

impl ImageFetcher for HttpImageFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = Request::get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if !resp.ok() {
            return Err(FetchError::Status {
                status: resp.status(),
                message: format!("HTTP error {}", resp.status()),
            });
        }
        resp.binary()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
