//! Scripted inference runtime for exercising the service without a model.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use honyaku_inference::{
    ChatTurn, GenerateParameters, GenerationEvent, GenerationInfo, GenerationStream,
    InferenceError, InferenceRuntime, InferenceSession, LoadProgress, ProgressFn,
};
use tokio::sync::Notify;

#[derive(Default)]
struct Shared {
    loads: AtomicUsize,
    generations: AtomicUsize,
    failing_loads: AtomicUsize,
    cache_limit: AtomicU64,
    requests: Mutex<Vec<Vec<ChatTurn>>>,
}

/// Replays fixed chunks for every request
pub struct ScriptedRuntime {
    shared: Arc<Shared>,
    chunks: Vec<String>,
    progress_steps: Vec<LoadProgress>,
    load_delay: Option<Duration>,
    hold: Option<(usize, Arc<Notify>)>,
    fail_generation: Option<String>,
}

impl ScriptedRuntime {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            progress_steps: vec![
                LoadProgress {
                    completed: 1,
                    total: 2,
                },
                LoadProgress {
                    completed: 2,
                    total: 2,
                },
            ],
            load_delay: None,
            hold: None,
            fail_generation: None,
        }
    }

    /// Make the next `count` loads fail
    pub fn fail_next_loads(self, count: usize) -> Self {
        self.shared.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Pause every stream before chunk `index` until `gate` is notified
    pub fn hold_before_chunk(mut self, index: usize, gate: Arc<Notify>) -> Self {
        self.hold = Some((index, gate));
        self
    }

    /// Streams emit their chunks, then this error
    pub fn fail_generation_with(mut self, message: &str) -> Self {
        self.fail_generation = Some(message.to_string());
        self
    }

    pub fn loads(&self) -> usize {
        self.shared.loads.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> usize {
        self.shared.generations.load(Ordering::SeqCst)
    }

    pub fn cache_limit(&self) -> u64 {
        self.shared.cache_limit.load(Ordering::SeqCst)
    }

    /// Chat turns of every generate call so far
    pub fn requests(&self) -> Vec<Vec<ChatTurn>> {
        self.shared.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceRuntime for ScriptedRuntime {
    fn set_cache_limit(&self, bytes: u64) {
        self.shared.cache_limit.store(bytes, Ordering::SeqCst);
    }

    async fn load(
        &self,
        model_id: &str,
        progress: ProgressFn,
    ) -> Result<Arc<dyn InferenceSession>, InferenceError> {
        self.shared.loads.fetch_add(1, Ordering::SeqCst);
        for step in &self.progress_steps {
            progress(*step);
        }
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.shared.failing_loads.load(Ordering::SeqCst);
        if failing > 0 {
            self.shared.failing_loads.store(failing - 1, Ordering::SeqCst);
            return Err(InferenceError::Load(format!("cannot fetch {}", model_id)));
        }

        Ok(Arc::new(ScriptedSession {
            model_id: model_id.to_string(),
            shared: self.shared.clone(),
            chunks: self.chunks.clone(),
            hold: self.hold.clone(),
            fail_generation: self.fail_generation.clone(),
        }))
    }
}

struct ScriptedSession {
    model_id: String,
    shared: Arc<Shared>,
    chunks: Vec<String>,
    hold: Option<(usize, Arc<Notify>)>,
    fail_generation: Option<String>,
}

#[async_trait]
impl InferenceSession for ScriptedSession {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        turns: &[ChatTurn],
        _params: &GenerateParameters,
    ) -> Result<GenerationStream, InferenceError> {
        self.shared.generations.fetch_add(1, Ordering::SeqCst);
        self.shared.requests.lock().unwrap().push(turns.to_vec());

        let mut events: VecDeque<Result<GenerationEvent, InferenceError>> = self
            .chunks
            .iter()
            .map(|c| Ok(GenerationEvent::Chunk(c.clone())))
            .collect();
        // Statistics arrive mid-stream too, they must not reach the output
        events.push_back(Ok(GenerationEvent::Info(GenerationInfo {
            prompt_tokens: 4,
            generated_tokens: self.chunks.len() as u64,
            tokens_per_second: 100.0,
        })));
        if let Some(message) = &self.fail_generation {
            events.push_back(Err(InferenceError::Generation(message.clone())));
        }

        let state = (events, 0usize, self.hold.clone());
        Ok(stream::unfold(state, |(mut events, index, hold)| async move {
            if let Some((at, gate)) = &hold
                && *at == index
            {
                gate.notified().await;
            }
            let event = events.pop_front()?;
            Some((event, (events, index + 1, hold)))
        })
        .boxed())
    }
}
