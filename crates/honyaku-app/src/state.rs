use std::sync::Arc;
use std::time::Duration;

use honyaku_config::{Config, JsonSettingsStore, SettingsStore};
use honyaku_core::{ModelRegistry, ServiceOptions, TranslationService};
use honyaku_inference::{GenerateParameters, InferenceRuntime, OllamaRuntime};
use honyaku_io::SelfWriteGuard;
use tokio::sync::RwLock;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub service: Arc<TranslationService>,
    /// Shared by the clipboard watcher and the copy-result writer
    pub clipboard_guard: SelfWriteGuard,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let runtime = OllamaRuntime::new(
            config.runtime.base_url.clone(),
            config.runtime.keep_alive.clone(),
            Duration::from_secs(config.runtime.request_timeout_seconds),
        )?;
        tracing::info!("Using inference runtime at {}", config.runtime.base_url);

        let settings = JsonSettingsStore::open_default();
        tracing::debug!("Settings stored in {:?}", settings.path());

        Ok(Self::with_runtime(config, Arc::new(runtime), Arc::new(settings)))
    }

    pub fn with_runtime(
        config: Config,
        runtime: Arc<dyn InferenceRuntime>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let options = ServiceOptions {
            params: GenerateParameters {
                temperature: config.generation.temperature,
                top_p: config.generation.top_p,
                repetition_penalty: config.generation.repetition_penalty,
            },
            cache_limit_bytes: config.runtime.cache_limit_bytes,
        };
        let registry = ModelRegistry::new(config.models.clone());
        let clipboard_guard =
            SelfWriteGuard::new(Duration::from_millis(config.clipboard.self_write_suppression_ms));

        Self {
            config: Arc::new(RwLock::new(config)),
            service: Arc::new(TranslationService::new(runtime, registry, settings, options)),
            clipboard_guard,
        }
    }
}
