use vistral_stream::StreamConfig;

/// Everything the watcher needs to open one job's stream.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub job_id: String,
    pub stream: StreamConfig,
}

impl WatchConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                        | Required | Default                 |
    /// |--------------------------------|----------|-------------------------|
    /// | `VISTRAL_JOB_ID`               | yes      | --                      |
    /// | `VISTRAL_API_URL`              | no       | `http://localhost:8000` |
    /// | `VISTRAL_CONNECT_TIMEOUT_SECS` | no       | `10`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let job_id =
            std::env::var("VISTRAL_JOB_ID").map_err(|_| ConfigError::Missing("VISTRAL_JOB_ID"))?;
        Self::new(job_id, StreamConfig::from_env())
    }

    pub fn new(job_id: impl Into<String>, stream: StreamConfig) -> Result<Self, ConfigError> {
        let job_id = job_id.into().trim().to_owned();
        if job_id.is_empty() {
            return Err(ConfigError::Invalid("VISTRAL_JOB_ID", "must not be empty"));
        }
        if job_id.contains('/') {
            return Err(ConfigError::Invalid("VISTRAL_JOB_ID", "must not contain '/'"));
        }
        Ok(Self { job_id, stream })
    }

    pub fn stream_url(&self) -> String {
        self.stream.stream_url(&self.job_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{0} {1}")]
    Invalid(&'static str, &'static str),
}
