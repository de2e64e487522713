/// Lifecycle of the inference session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
}

/// Everything a front end observes about the translation service
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceSnapshot {
    pub selected_model_id: String,
    pub load_state: LoadState,
    /// Present only while loading, in `[0, 1]`
    pub load_progress: Option<f64>,
    pub is_generating: bool,
    /// Text of the running or last finished translation
    pub output: String,
}
