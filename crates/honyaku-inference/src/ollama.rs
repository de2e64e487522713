//! Runtime backed by a local Ollama server.
//!
//! Loading pulls the model (streaming download progress) and then issues an
//! empty generate request so the server keeps the weights resident.
//! Generation uses the streaming chat endpoint.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::ndjson::LineDecoder;
use crate::{
    ChatTurn, GenerateParameters, GenerationEvent, GenerationInfo, GenerationStream,
    InferenceError, InferenceRuntime, InferenceSession, LoadProgress, ProgressFn,
};

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct WarmupRequest<'a> {
    model: &'a str,
    stream: bool,
    keep_alive: &'a str,
}

#[derive(Debug, Deserialize)]
struct WarmupResponse {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
    options: ChatOptions,
    keep_alive: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    /// Nanoseconds
    #[serde(default)]
    eval_duration: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Sums per-layer download progress reported by a pull
#[derive(Debug, Default)]
struct PullProgress {
    layers: HashMap<String, (u64, u64)>,
}

impl PullProgress {
    fn update(&mut self, status: &PullStatus) -> Option<LoadProgress> {
        if status.status.as_deref() == Some("success") {
            let total = self.total().max(1);
            return Some(LoadProgress {
                completed: total,
                total,
            });
        }

        let (digest, total) = (status.digest.as_ref()?, status.total?);
        let completed = status.completed.unwrap_or(0).min(total);
        self.layers.insert(digest.clone(), (completed, total));

        Some(LoadProgress {
            completed: self.layers.values().map(|(c, _)| c).sum(),
            total: self.total(),
        })
    }

    fn total(&self) -> u64 {
        self.layers.values().map(|(_, t)| t).sum()
    }
}

/// Turn one chat stream line into events. A `done` line carries statistics.
fn parse_chat_line(line: &str) -> Result<(Vec<GenerationEvent>, bool), InferenceError> {
    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| InferenceError::Protocol(format!("{}: {}", e, line)))?;

    if let Some(error) = chunk.error {
        return Err(InferenceError::Generation(error));
    }

    let mut events = Vec::new();
    if let Some(message) = chunk.message
        && !message.content.is_empty()
    {
        events.push(GenerationEvent::Chunk(message.content));
    }

    if chunk.done {
        let generated_tokens = chunk.eval_count.unwrap_or(0);
        let tokens_per_second = match chunk.eval_duration {
            Some(ns) if ns > 0 => generated_tokens as f64 / (ns as f64 / 1e9),
            _ => 0.0,
        };
        events.push(GenerationEvent::Info(GenerationInfo {
            prompt_tokens: chunk.prompt_eval_count.unwrap_or(0),
            generated_tokens,
            tokens_per_second,
        }));
    }

    Ok((events, chunk.done))
}

/// Read the `error` field of a failed response, falling back to the raw body
async fn error_from_response(response: reqwest::Response) -> InferenceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| json["error"].as_str().map(str::to_string))
        .unwrap_or(body);
    InferenceError::Http { status, message }
}

/// Server-side rejections during loading are load failures
fn into_load_error(error: InferenceError) -> InferenceError {
    match error {
        InferenceError::Http { message, .. } => InferenceError::Load(message),
        other => other,
    }
}

struct ChatStreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: LineDecoder,
    pending: VecDeque<Result<GenerationEvent, InferenceError>>,
    finished: bool,
}

impl ChatStreamState {
    fn enqueue(&mut self, line: &str) {
        if self.finished {
            return;
        }
        match parse_chat_line(line) {
            Ok((events, done)) => {
                self.pending.extend(events.into_iter().map(Ok));
                self.finished = done;
            }
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
            }
        }
    }
}

fn chat_stream(response: reqwest::Response) -> GenerationStream {
    let state = ChatStreamState {
        body: response.bytes_stream().map(|r| r.map(|b| b.to_vec())).boxed(),
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for line in state.decoder.push(&bytes) {
                        state.enqueue(&line);
                    }
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(e.into()));
                    state.finished = true;
                }
                None => {
                    if let Some(line) = state.decoder.finish() {
                        state.enqueue(&line);
                    }
                    // A body that closes without a done line is a truncated reply
                    if !state.finished {
                        state.pending.push_back(Err(InferenceError::Protocol(
                            "chat stream ended before done".to_string(),
                        )));
                        state.finished = true;
                    }
                }
            }
        }
    })
    .boxed()
}

pub struct OllamaRuntime {
    client: reqwest::Client,
    base_url: String,
    keep_alive: String,
    cache_limit_bytes: AtomicU64,
}

impl OllamaRuntime {
    pub fn new(
        base_url: impl Into<String>,
        keep_alive: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keep_alive: keep_alive.into(),
            cache_limit_bytes: AtomicU64::new(0),
        })
    }

    pub fn cache_limit(&self) -> u64 {
        self.cache_limit_bytes.load(Ordering::Relaxed)
    }

    async fn pull(&self, model_id: &str, progress: &ProgressFn) -> Result<(), InferenceError> {
        let response = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .json(&PullRequest {
                model: model_id,
                stream: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let mut body = response.bytes_stream();
        let mut decoder = LineDecoder::new();
        let mut aggregate = PullProgress::default();
        let mut succeeded = false;
        let mut body_done = false;

        while !succeeded && !body_done {
            let lines = match body.next().await {
                Some(chunk) => decoder.push(&chunk?),
                None => {
                    body_done = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for line in lines {
                let status: PullStatus = serde_json::from_str(&line)
                    .map_err(|e| InferenceError::Protocol(format!("{}: {}", e, line)))?;
                if let Some(error) = status.error {
                    return Err(InferenceError::Load(error));
                }
                if let Some(update) = aggregate.update(&status) {
                    progress(update);
                }
                match status.status.as_deref() {
                    Some("success") => succeeded = true,
                    Some(message) => tracing::debug!("pull {}: {}", model_id, message),
                    None => {}
                }
            }
        }

        if succeeded {
            Ok(())
        } else {
            Err(InferenceError::Load(format!(
                "pull of {} ended without success",
                model_id
            )))
        }
    }

    async fn warm_up(&self, model_id: &str) -> Result<(), InferenceError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&WarmupRequest {
                model: model_id,
                stream: false,
                keep_alive: &self.keep_alive,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: WarmupResponse = response.json().await?;
        match body.error {
            Some(error) => Err(InferenceError::Load(error)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InferenceRuntime for OllamaRuntime {
    fn set_cache_limit(&self, bytes: u64) {
        self.cache_limit_bytes.store(bytes, Ordering::Relaxed);
    }

    async fn load(
        &self,
        model_id: &str,
        progress: ProgressFn,
    ) -> Result<Arc<dyn InferenceSession>, InferenceError> {
        // Ollama owns model memory, the limit is only reported
        tracing::info!(
            "Loading {} (cache limit {} MiB, managed by the server)",
            model_id,
            self.cache_limit() / (1024 * 1024)
        );

        self.pull(model_id, &progress).await.map_err(into_load_error)?;
        self.warm_up(model_id).await.map_err(into_load_error)?;

        tracing::info!("{} is ready", model_id);
        Ok(Arc::new(OllamaSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            keep_alive: self.keep_alive.clone(),
            model_id: model_id.to_string(),
        }))
    }
}

pub struct OllamaSession {
    client: reqwest::Client,
    base_url: String,
    keep_alive: String,
    model_id: String,
}

#[async_trait]
impl InferenceSession for OllamaSession {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        turns: &[ChatTurn],
        params: &GenerateParameters,
    ) -> Result<GenerationStream, InferenceError> {
        let request = ChatRequest {
            model: &self.model_id,
            messages: turns,
            stream: true,
            options: ChatOptions {
                temperature: params.temperature,
                top_p: params.top_p,
                repeat_penalty: params.repetition_penalty,
            },
            keep_alive: &self.keep_alive,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(chat_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures_util::TryStreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_parse_chat_chunk() {
        let (events, done) =
            parse_chat_line(r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#)
                .unwrap();
        assert_eq!(events, vec![GenerationEvent::Chunk("Hel".to_string())]);
        assert!(!done);
    }

    #[test]
    fn test_parse_final_chunk_has_stats() {
        let (events, done) = parse_chat_line(
            r#"{"message":{"role":"assistant","content":""},"done":true,"prompt_eval_count":12,"eval_count":20,"eval_duration":500000000}"#,
        )
        .unwrap();
        assert!(done);
        assert_eq!(
            events,
            vec![GenerationEvent::Info(GenerationInfo {
                prompt_tokens: 12,
                generated_tokens: 20,
                tokens_per_second: 40.0,
            })]
        );
    }

    #[test]
    fn test_parse_error_line() {
        let result = parse_chat_line(r#"{"error":"out of memory"}"#);
        assert!(matches!(result, Err(InferenceError::Generation(msg)) if msg == "out of memory"));
    }

    #[test]
    fn test_parse_garbage_is_protocol_error() {
        assert!(matches!(
            parse_chat_line("not json"),
            Err(InferenceError::Protocol(_))
        ));
    }

    #[test]
    fn test_pull_progress_sums_layers() {
        let mut progress = PullProgress::default();
        let status = |digest: &str, completed, total| PullStatus {
            status: Some("downloading".to_string()),
            digest: Some(digest.to_string()),
            total: Some(total),
            completed: Some(completed),
            ..Default::default()
        };

        assert_eq!(
            progress.update(&PullStatus {
                status: Some("pulling manifest".to_string()),
                ..Default::default()
            }),
            None
        );
        assert_eq!(progress.update(&status("a", 50, 100)).unwrap().fraction(), 0.5);
        assert_eq!(progress.update(&status("b", 0, 100)).unwrap().fraction(), 0.25);
        assert_eq!(progress.update(&status("b", 100, 100)).unwrap().fraction(), 0.75);
        let done = progress
            .update(&PullStatus {
                status: Some("success".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(done.fraction(), 1.0);
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return String::from_utf8_lossy(&buf).to_string();
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                let len = head
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                while buf.len() < pos + 4 + len {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                return head;
            }
        }
    }

    /// Serve canned `(path, status, body)` responses, recording request paths
    async fn fake_server(
        routes: Vec<(&'static str, u16, String)>,
    ) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                let seen = seen_clone.clone();
                tokio::spawn(async move {
                    let head = read_request(&mut socket).await;
                    let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
                    seen.lock().unwrap().push(path.clone());

                    let (status, body) = routes
                        .iter()
                        .find(|(p, _, _)| *p == path)
                        .map(|(_, s, b)| (*s, b.clone()))
                        .unwrap_or((404, r#"{"error":"not found"}"#.to_string()));
                    let response = format!(
                        "HTTP/1.1 {} X\r\ncontent-type: application/x-ndjson\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.shutdown().await.ok();
                });
            }
        });

        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn test_load_and_generate() {
        let pull = [
            r#"{"status":"pulling manifest"}"#,
            r#"{"status":"downloading","digest":"sha256:a","total":200,"completed":100}"#,
            r#"{"status":"downloading","digest":"sha256:a","total":200,"completed":200}"#,
            r#"{"status":"success"}"#,
        ]
        .join("\n");
        let chat = [
            r#"{"message":{"role":"assistant","content":"Hello"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":", world"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":true,"eval_count":2,"eval_duration":1000000000}"#,
        ]
        .join("\n")
            + "\n";
        let (url, seen) = fake_server(vec![
            ("/api/pull", 200, pull),
            ("/api/generate", 200, r#"{"done":true}"#.to_string()),
            ("/api/chat", 200, chat),
        ])
        .await;

        let runtime = OllamaRuntime::new(url, "5m", Duration::from_secs(5)).unwrap();
        runtime.set_cache_limit(1024);
        let fractions = Arc::new(Mutex::new(Vec::new()));
        let sink = fractions.clone();
        let session = runtime
            .load(
                "tiny",
                Arc::new(move |p: LoadProgress| sink.lock().unwrap().push(p.fraction())),
            )
            .await
            .unwrap();

        assert_eq!(session.model_id(), "tiny");
        assert_eq!(*fractions.lock().unwrap(), vec![0.5, 1.0, 1.0]);

        let events: Vec<GenerationEvent> = session
            .generate(&[ChatTurn::user("こんにちは")], &GenerateParameters::default())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(
            events,
            vec![
                GenerationEvent::Chunk("Hello".to_string()),
                GenerationEvent::Chunk(", world".to_string()),
                GenerationEvent::Info(GenerationInfo {
                    prompt_tokens: 0,
                    generated_tokens: 2,
                    tokens_per_second: 2.0,
                }),
            ]
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["/api/pull", "/api/generate", "/api/chat"]
        );
    }

    #[tokio::test]
    async fn test_pull_error_is_load_error() {
        let (url, _) = fake_server(vec![(
            "/api/pull",
            200,
            r#"{"status":"pulling manifest"}
{"error":"pull model manifest: file does not exist"}"#
                .to_string(),
        )])
        .await;

        let runtime = OllamaRuntime::new(url, "5m", Duration::from_secs(5)).unwrap();
        let result = runtime.load("missing", Arc::new(|_| {})).await;

        assert!(matches!(result, Err(InferenceError::Load(msg)) if msg.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_chat_without_done_is_protocol_error() {
        let (url, _) = fake_server(vec![(
            "/api/chat",
            200,
            r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#.to_string() + "\n",
        )])
        .await;

        let session = OllamaSession {
            client: reqwest::Client::new(),
            base_url: url,
            keep_alive: "5m".to_string(),
            model_id: "tiny".to_string(),
        };
        let events: Vec<Result<GenerationEvent, InferenceError>> = session
            .generate(&[ChatTurn::user("Hello")], &GenerateParameters::default())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Ok(GenerationEvent::Chunk(text)) if text == "Hel"));
        assert!(matches!(&events[1], Err(InferenceError::Protocol(msg)) if msg.contains("before done")));
    }

    #[tokio::test]
    async fn test_http_error_on_chat() {
        let (url, _) = fake_server(vec![(
            "/api/chat",
            500,
            r#"{"error":"model crashed"}"#.to_string(),
        )])
        .await;

        let session = OllamaSession {
            client: reqwest::Client::new(),
            base_url: url,
            keep_alive: "5m".to_string(),
            model_id: "tiny".to_string(),
        };
        let result = session
            .generate(&[ChatTurn::user("Hello")], &GenerateParameters::default())
            .await;

        assert!(matches!(
            result,
            Err(InferenceError::Http { status: 500, ref message }) if message == "model crashed"
        ));
    }
}
