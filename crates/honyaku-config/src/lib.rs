use std::path::PathBuf;

use directories::ProjectDirs;
use honyaku_types::ModelDescriptor;
use serde::{Deserialize, Serialize};

use self::clipboard::ClipboardConfig;
use self::generation::GenerationConfig;
use self::runtime::RuntimeConfig;

pub mod clipboard;
pub mod generation;
pub mod models;
pub mod runtime;
pub mod settings;

pub use settings::{JsonSettingsStore, MemorySettingsStore, SELECTED_MODEL_KEY, SettingsStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub generation: GenerationConfig,
    pub clipboard: ClipboardConfig,
    /// Selectable models, the first one is the default selection
    #[serde(default = "models::default_models")]
    pub models: Vec<ModelDescriptor>,
}

impl Config {
    pub fn new() -> Self {
        Config {
            runtime: RuntimeConfig::new(),
            generation: GenerationConfig::default(),
            clipboard: ClipboardConfig::default(),
            models: models::default_models(),
        }
    }

    /// Re-apply environment overrides on top of a loaded profile
    pub fn apply_env_overrides(&mut self) {
        self.runtime.apply_env_overrides();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "honyaku")
}

/// Directory holding profiles, falls back to `./.honyaku` when no home directory exists
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".honyaku"))
}

/// Directory holding persisted settings
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".honyaku"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"generation": {"temperature": 0.7}}"#)
            .expect("partial config should parse");

        assert_eq!(config.generation.temperature, 0.7);
        assert_eq!(config.generation.repetition_penalty, Some(1.05));
        assert_eq!(config.clipboard.poll_interval_ms, 100);
        assert_eq!(config.clipboard.double_copy_threshold_ms, 600);
        assert!(!config.models.is_empty());
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = Config::new();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(back.models, config.models);
        assert_eq!(back.runtime.base_url, config.runtime.base_url);
    }
}
