use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clipboard::{ClipboardSource, SelfWriteGuard};
use crate::detector::{DoubleCopyDetector, DoubleCopyWatcher};

type DoubleCopyCallback = Box<dyn Fn(String) + Send + Sync>;

/// Polls the clipboard and reports double-copy gestures to a single subscriber.
///
/// The callback runs on the polling thread. Consumers that touch UI state
/// should forward the text to their own context, e.g. through a channel.
pub struct ClipboardMonitor {
    interval: Duration,
    threshold: Duration,
    guard: Option<SelfWriteGuard>,
    callback: Arc<Mutex<Option<DoubleCopyCallback>>>,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl ClipboardMonitor {
    pub fn new(interval: Duration, threshold: Duration) -> Self {
        Self {
            interval,
            threshold,
            guard: None,
            callback: Arc::new(Mutex::new(None)),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Ignore changes made through writers sharing this guard
    pub fn with_guard(mut self, guard: SelfWriteGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Set the subscriber, replacing any previous one
    pub fn on_double_copy<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let mut slot = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Box::new(callback));
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Start polling on a blocking thread. The source is created on that thread.
    ///
    /// Returns `None` if the monitor is already running.
    pub fn start<S, F>(&self, open_source: F) -> Option<JoinHandle<()>>
    where
        S: ClipboardSource + 'static,
        F: FnOnce() -> anyhow::Result<S> + Send + 'static,
    {
        // Don't start again if already running
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Clipboard monitor already running");
            return None;
        }

        let interval = self.interval;
        let detector = DoubleCopyDetector::new(self.threshold);
        let guard = self.guard.clone();
        let callback = Arc::clone(&self.callback);
        let cancel = self.cancel.clone();

        Some(tokio::task::spawn_blocking(move || {
            let source = match open_source() {
                Ok(source) => source,
                Err(e) => {
                    tracing::error!("Failed to open clipboard: {}", e);
                    return;
                }
            };
            let mut watcher = DoubleCopyWatcher::new(source, detector, guard);

            tracing::info!("Clipboard monitor started ({:?} interval)", interval);
            while !cancel.is_cancelled() {
                if let Some(text) = watcher.poll(Instant::now()) {
                    tracing::info!("Double copy detected ({} chars)", text.chars().count());
                    let slot = callback.lock().unwrap_or_else(|e| e.into_inner());
                    if let Some(callback) = slot.as_ref() {
                        callback(text);
                    }
                }
                std::thread::sleep(interval);
            }
            tracing::info!("Clipboard monitor stopping");
        }))
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedClipboard(Arc<Mutex<(u64, Option<String>)>>);

    impl SharedClipboard {
        fn copy(&self, text: &str) {
            let mut inner = self.0.lock().unwrap();
            inner.0 += 1;
            inner.1 = Some(text.to_string());
        }
    }

    impl ClipboardSource for SharedClipboard {
        fn revision(&mut self) -> u64 {
            self.0.lock().unwrap().0
        }

        fn text(&mut self) -> Option<String> {
            self.0.lock().unwrap().1.clone()
        }
    }

    #[tokio::test]
    async fn test_double_copy_reaches_subscriber() {
        let clipboard = SharedClipboard::default();
        let monitor = ClipboardMonitor::new(Duration::from_millis(5), Duration::from_secs(2));
        let (tx, rx) = kanal::unbounded_async::<String>();
        monitor.on_double_copy(move |text| {
            tx.try_send(text).expect("send failed");
        });

        let source = clipboard.clone();
        let handle = monitor.start(move || Ok(source)).expect("first start");

        tokio::time::sleep(Duration::from_millis(30)).await;
        clipboard.copy("Hello");
        tokio::time::sleep(Duration::from_millis(30)).await;
        clipboard.copy("Hello");

        let text = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout waiting for double copy")
            .expect("channel closed");
        assert_eq!(text, "Hello");

        monitor.stop();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let monitor = ClipboardMonitor::new(Duration::from_millis(5), Duration::from_millis(600));
        let source = SharedClipboard::default();

        let first = monitor.start({
            let source = source.clone();
            move || Ok(source)
        });
        let second = monitor.start(move || Ok(source));

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(monitor.is_started());
        monitor.stop();
    }
}
