//! HTTP transport for a job's progress stream.
//!
//! [`StreamClient`] holds the endpoint for one job. Call
//! [`StreamClient::connect`] to open the `text/event-stream` response
//! and get a [`StreamConnection`] whose body yields raw byte chunks.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};

/// Connection configuration for one job's event stream.
pub struct StreamClient {
    http: reqwest::Client,
    url: String,
}

/// An open event stream.
pub struct StreamConnection {
    /// Endpoint the stream was opened against.
    pub url: String,
    /// Raw response body chunks, in arrival order.
    pub body: BoxStream<'static, Result<Bytes, StreamError>>,
}

impl StreamClient {
    /// Create a client for a specific stream endpoint.
    ///
    /// * `http` - shared HTTP client, see
    ///   [`StreamConfig::build_client`](crate::StreamConfig::build_client).
    /// * `url`  - full stream URL, e.g. `http://host:8000/api/jobs/<id>/stream`.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the stream. Single attempt; the caller decides what a
    /// failure means.
    pub async fn connect(&self) -> Result<StreamConnection, StreamError> {
        let response = self
            .http
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| {
                StreamError::Connect(format!("Failed to open event stream at {}: {e}", self.url))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }

        tracing::info!(url = %self.url, "Event stream opened");

        let body = response
            .bytes_stream()
            .map_err(|e| StreamError::Transport(e.to_string()))
            .boxed();

        Ok(StreamConnection {
            url: self.url.clone(),
            body,
        })
    }
}

/// Errors that can occur on the stream transport.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The HTTP client could not be built.
    #[error("Client error: {0}")]
    Client(String),

    /// The request never produced a response.
    #[error("Connection error: {0}")]
    Connect(String),

    /// The server answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Reading the open body failed.
    #[error("Transport error: {0}")]
    Transport(String),
}
