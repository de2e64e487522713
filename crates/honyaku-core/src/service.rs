//! Translation orchestration on top of an inference runtime.
//!
//! [`TranslationService`] owns the session lifecycle (not loaded, loading,
//! loaded), runs one translation at a time and republishes streamed output
//! through a watch channel. Every observable change goes through that
//! channel, so front ends only ever see consistent snapshots.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use honyaku_config::{SELECTED_MODEL_KEY, SettingsStore};
use honyaku_inference::{
    GenerateParameters, GenerationEvent, InferenceRuntime, InferenceSession, LoadProgress,
    ProgressFn,
};
use honyaku_types::ModelDescriptor;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::TranslateError;
use crate::preprocess::normalize_input;
use crate::prompt::build_request;
use crate::registry::ModelRegistry;
use crate::state::{LoadState, ServiceSnapshot};

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub params: GenerateParameters,
    /// Applied to the runtime before each session load
    pub cache_limit_bytes: u64,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            params: GenerateParameters::default(),
            cache_limit_bytes: 400 * 1024 * 1024,
        }
    }
}

pub struct TranslationService {
    runtime: Arc<dyn InferenceRuntime>,
    registry: ModelRegistry,
    settings: Arc<dyn SettingsStore>,
    options: ServiceOptions,
    session: Mutex<Option<Arc<dyn InferenceSession>>>,
    /// Bumped on every reset; work started under an older epoch stops publishing
    epoch: Arc<AtomicU64>,
    load_lock: tokio::sync::Mutex<()>,
    generating: AtomicBool,
    state: Arc<watch::Sender<ServiceSnapshot>>,
}

/// Holds the single translation slot, releases it on every exit path
struct FlightGuard<'a> {
    service: &'a TranslationService,
}

impl<'a> FlightGuard<'a> {
    fn acquire(service: &'a TranslationService) -> Option<Self> {
        if service.generating.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(Self { service })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.service
            .state
            .send_if_modified(|s| std::mem::replace(&mut s.is_generating, false));
        self.service.generating.store(false, Ordering::SeqCst);
    }
}

impl TranslationService {
    /// The persisted selection is restored if it is still in the registry
    pub fn new(
        runtime: Arc<dyn InferenceRuntime>,
        registry: ModelRegistry,
        settings: Arc<dyn SettingsStore>,
        options: ServiceOptions,
    ) -> Self {
        let selected_model_id = match settings.get(SELECTED_MODEL_KEY) {
            Some(id) if registry.get(&id).is_some() => id,
            Some(id) => {
                tracing::warn!("Persisted model {} is no longer available", id);
                registry.default_model().id.clone()
            }
            None => registry.default_model().id.clone(),
        };

        let (state, _) = watch::channel(ServiceSnapshot {
            selected_model_id,
            ..Default::default()
        });

        Self {
            runtime,
            registry,
            settings,
            options,
            session: Mutex::new(None),
            epoch: Arc::new(AtomicU64::new(0)),
            load_lock: tokio::sync::Mutex::new(()),
            generating: AtomicBool::new(false),
            state: Arc::new(state),
        }
    }

    /// New observer of state changes
    pub fn subscribe(&self) -> watch::Receiver<ServiceSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        self.state.borrow().clone()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn selected_model(&self) -> ModelDescriptor {
        let id = self.state.borrow().selected_model_id.clone();
        self.registry
            .get(&id)
            .unwrap_or_else(|| self.registry.default_model())
            .clone()
    }

    fn current_session(&self) -> Option<Arc<dyn InferenceSession>> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Load the selected model. No-op when already loaded; concurrent callers
    /// wait for the first load instead of starting another.
    pub async fn load_model(&self) -> Result<(), TranslateError> {
        let _loading = self.load_lock.lock().await;
        if self.current_session().is_some() {
            return Ok(());
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let model_id = self.state.borrow().selected_model_id.clone();
        self.state.send_modify(|s| {
            s.load_state = LoadState::Loading;
            s.load_progress = Some(0.0);
        });

        self.runtime.set_cache_limit(self.options.cache_limit_bytes);

        let progress: ProgressFn = {
            let state = Arc::clone(&self.state);
            let current_epoch = Arc::clone(&self.epoch);
            Arc::new(move |progress: LoadProgress| {
                if current_epoch.load(Ordering::SeqCst) != epoch {
                    return;
                }
                state.send_if_modified(|s| {
                    if s.load_state != LoadState::Loading {
                        return false;
                    }
                    s.load_progress = Some(progress.fraction());
                    true
                });
            })
        };

        tracing::info!("Loading model {}", model_id);
        let result = self.runtime.load(&model_id, progress).await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::info!("Discarding {}, selection changed while loading", model_id);
            return Err(TranslateError::Superseded);
        }

        match result {
            Ok(session) => {
                *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
                self.state.send_modify(|s| {
                    s.load_state = LoadState::Loaded;
                    s.load_progress = None;
                });
                tracing::info!("Model {} loaded", model_id);
                Ok(())
            }
            Err(e) => {
                self.state.send_modify(|s| {
                    s.load_state = LoadState::NotLoaded;
                    s.load_progress = None;
                });
                tracing::error!("Failed to load {}: {}", model_id, e);
                Err(TranslateError::ModelLoad(e))
            }
        }
    }

    /// Drop the session and clear output. Streams in flight keep running but
    /// no longer publish.
    pub fn reset_model(&self) {
        self.unload(None);
    }

    fn unload(&self, select: Option<&str>) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.state.send_modify(|s| {
            if let Some(id) = select {
                s.selected_model_id = id.to_string();
            }
            s.load_state = LoadState::NotLoaded;
            s.load_progress = None;
            s.output.clear();
        });
    }

    /// Switch models. Persists the choice and resets when it differs.
    ///
    /// Returns whether the selection changed.
    pub fn select_model(&self, id: &str) -> Result<bool, TranslateError> {
        if self.registry.get(id).is_none() {
            return Err(TranslateError::UnknownModel(id.to_string()));
        }

        if let Err(e) = self.settings.set(SELECTED_MODEL_KEY, id) {
            tracing::warn!("Failed to persist model selection: {:#}", e);
        }

        if self.state.borrow().selected_model_id == id {
            return Ok(false);
        }

        tracing::info!("Selected model {}", id);
        self.unload(Some(id));
        Ok(true)
    }

    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        self.translate_with_cancel(text, CancellationToken::new())
            .await
    }

    /// Translate `text`, loading the model first if needed.
    ///
    /// Only one translation runs at a time, a second call fails with
    /// [`TranslateError::Busy`].
    pub async fn translate_with_cancel(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<String, TranslateError> {
        let _flight = FlightGuard::acquire(self).ok_or(TranslateError::Busy)?;

        let session = match self.current_session() {
            Some(session) => session,
            None => {
                self.load_model().await?;
                self.current_session()
                    .ok_or(TranslateError::ModelNotLoaded)?
            }
        };

        let descriptor = self
            .registry
            .get(session.model_id())
            .unwrap_or_else(|| self.registry.default_model())
            .clone();
        let input = normalize_input(text);
        let turns = build_request(&descriptor, &input);

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.is_generating = true;
            s.output.clear();
        });

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("translate", %request_id, model = %descriptor.id);

        let result: Result<String, TranslateError> = async {
            tracing::info!("Translating {} chars", input.chars().count());

            let mut stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TranslateError::Cancelled),
                stream = session.generate(&turns, &self.options.params) => match stream {
                    Ok(stream) => stream,
                    Err(e) => return Err(TranslateError::Generation(e)),
                },
            };

            let mut full_output = String::new();
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!("Cancelled after {} chars", full_output.chars().count());
                        return Err(TranslateError::Cancelled);
                    }
                    event = stream.next() => event,
                };

                match event {
                    Some(Ok(GenerationEvent::Chunk(chunk))) => {
                        full_output.push_str(&chunk);
                        self.publish_chunk(epoch, &chunk);
                    }
                    Some(Ok(GenerationEvent::Info(info))) => {
                        tracing::debug!(
                            "Generation info: {} prompt tokens, {} generated, {:.1} tok/s",
                            info.prompt_tokens,
                            info.generated_tokens,
                            info.tokens_per_second
                        );
                    }
                    Some(Err(e)) => {
                        tracing::error!("Generation failed: {}", e);
                        return Err(TranslateError::Generation(e));
                    }
                    None => break,
                }
            }

            tracing::info!("Translation finished ({} chars)", full_output.chars().count());
            Ok(full_output)
        }
        .instrument(span)
        .await;
        result
    }

    fn publish_chunk(&self, epoch: u64, chunk: &str) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        self.state.send_modify(|s| s.output.push_str(chunk));
    }
}
