//! Boundary to the runtime that loads models and generates text.
//!
//! Nothing here runs a model. [`InferenceRuntime`] materializes sessions and
//! [`InferenceSession`] streams generated text; [`ollama`] implements both
//! against a local Ollama server.

use std::sync::Arc;

use futures_util::stream::BoxStream;
use serde::Serialize;

pub mod error;
pub mod ndjson;
pub mod ollama;

pub use error::InferenceError;
pub use ollama::{OllamaRuntime, OllamaSession};

/// Model loading interface
#[async_trait::async_trait]
pub trait InferenceRuntime: Send + Sync {
    /// Upper bound on the runtime's memory cache, applied before loading
    fn set_cache_limit(&self, bytes: u64);

    /// Fetch (if needed) and materialize a session for `model_id`
    async fn load(
        &self,
        model_id: &str,
        progress: ProgressFn,
    ) -> Result<Arc<dyn InferenceSession>, InferenceError>;
}

/// A loaded model ready to generate
#[async_trait::async_trait]
pub trait InferenceSession: Send + Sync {
    fn model_id(&self) -> &str;

    /// Start generating. The returned stream is finite and cannot be restarted.
    async fn generate(
        &self,
        turns: &[ChatTurn],
        params: &GenerateParameters,
    ) -> Result<GenerationStream, InferenceError>;
}

pub type ProgressFn = Arc<dyn Fn(LoadProgress) + Send + Sync>;

pub type GenerationStream = BoxStream<'static, Result<GenerationEvent, InferenceError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One `{role, content}` unit of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateParameters {
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: Option<f32>,
}

impl Default for GenerateParameters {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 1.0,
            repetition_penalty: Some(1.05),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// Next piece of generated text
    Chunk(String),
    /// Statistics, carries no text
    Info(GenerationInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationInfo {
    pub prompt_tokens: u64,
    pub generated_tokens: u64,
    pub tokens_per_second: f64,
}

/// Byte-level progress of a model fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub completed: u64,
    pub total: u64,
}

impl LoadProgress {
    /// Fraction in `[0, 1]`, zero while the total is unknown
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        assert_eq!(LoadProgress { completed: 0, total: 0 }.fraction(), 0.0);
        assert_eq!(LoadProgress { completed: 5, total: 10 }.fraction(), 0.5);
        assert_eq!(LoadProgress { completed: 12, total: 10 }.fraction(), 1.0);
    }

    #[test]
    fn test_chat_turn_serializes_lowercase_role() {
        let json = serde_json::to_string(&ChatTurn::system("Translate to English.")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"Translate to English."}"#);
    }
}
