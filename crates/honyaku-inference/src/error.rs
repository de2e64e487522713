/// Errors surfaced by an inference runtime
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model load failed: {0}")]
    Load(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("runtime returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("malformed runtime response: {0}")]
    Protocol(String),
}
