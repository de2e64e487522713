use honyaku_inference::InferenceError;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("failed to load model: {0}")]
    ModelLoad(#[source] InferenceError),

    #[error("model not loaded")]
    ModelNotLoaded,

    #[error("generation failed: {0}")]
    Generation(#[source] InferenceError),

    #[error("a translation is already running")]
    Busy,

    #[error("translation cancelled")]
    Cancelled,

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("model selection changed while loading")]
    Superseded,
}
