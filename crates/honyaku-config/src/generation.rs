use serde::{Deserialize, Serialize};

fn default_temperature() -> f32 {
    0.5
}

fn default_top_p() -> f32 {
    1.0
}

fn default_repetition_penalty() -> Option<f32> {
    Some(1.05)
}

/// Decoding profile sent with every translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
        }
    }
}
