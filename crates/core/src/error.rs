#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}
