use std::time::Duration;

use crate::client::StreamError;

/// Default backend API base URL.
const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default TCP/TLS connect timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Where job streams live and how to reach them.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Backend API base URL, without a trailing slash.
    pub api_url: String,
    /// Connect timeout for opening a stream. There is no overall request
    /// timeout: a stream stays open for the whole pipeline run.
    pub connect_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl StreamConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `VISTRAL_API_URL`              | `http://localhost:8000` |
    /// | `VISTRAL_CONNECT_TIMEOUT_SECS` | `10`                    |
    pub fn from_env() -> Self {
        let api_url = std::env::var("VISTRAL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        let connect_timeout_secs: u64 = std::env::var("VISTRAL_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Self {
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            ..Self::new(api_url)
        }
    }

    /// Progress stream endpoint for a job.
    pub fn stream_url(&self, job_id: &str) -> String {
        format!("{}/api/jobs/{job_id}/stream", self.api_url)
    }

    /// Uploaded video endpoint for a job (the push backend's source).
    pub fn video_url(&self, job_id: &str) -> String {
        format!("{}/api/jobs/{job_id}/video", self.api_url)
    }

    /// Build the HTTP client used to open streams.
    pub fn build_client(&self) -> Result<reqwest::Client, StreamError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| StreamError::Client(e.to_string()))
    }
}
