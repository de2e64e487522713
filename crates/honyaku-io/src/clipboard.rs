use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arboard::Clipboard;

/// Read side of the system clipboard
pub trait ClipboardSource {
    /// Counter that changes whenever the clipboard contents change
    fn revision(&mut self) -> u64;

    /// Current plain text, `None` for empty, non-text or unreadable contents
    fn text(&mut self) -> Option<String>;
}

/// Write side of the system clipboard
pub trait ClipboardWriter {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// Clipboard backed by arboard.
///
/// On Windows the revision is the OS clipboard sequence number. Elsewhere it is
/// derived from the text contents, so copying the same text twice in a row is
/// not visible as a change.
pub struct ArboardClipboard {
    clipboard: Clipboard,
    #[cfg(not(windows))]
    fingerprint: Option<u64>,
    #[cfg(not(windows))]
    revision: u64,
}

impl ArboardClipboard {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            clipboard: Clipboard::new()?,
            #[cfg(not(windows))]
            fingerprint: None,
            #[cfg(not(windows))]
            revision: 0,
        })
    }
}

impl ClipboardSource for ArboardClipboard {
    #[cfg(windows)]
    fn revision(&mut self) -> u64 {
        u64::from(unsafe { windows::Win32::System::DataExchange::GetClipboardSequenceNumber() })
    }

    #[cfg(not(windows))]
    fn revision(&mut self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let fingerprint = self.clipboard.get_text().ok().map(|text| {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            hasher.finish()
        });

        if fingerprint != self.fingerprint {
            self.fingerprint = fingerprint;
            self.revision = self.revision.wrapping_add(1);
        }
        self.revision
    }

    fn text(&mut self) -> Option<String> {
        self.clipboard.get_text().ok().filter(|text| !text.is_empty())
    }
}

impl ClipboardWriter for ArboardClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.clipboard.set_text(text.to_string())?;
        Ok(())
    }
}

/// Marks clipboard writes made by this process so the watcher can skip them
#[derive(Clone)]
pub struct SelfWriteGuard {
    window: Duration,
    last_write: Arc<Mutex<Option<Instant>>>,
}

impl SelfWriteGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_write: Arc::new(Mutex::new(None)),
        }
    }

    pub fn mark_write_at(&self, now: Instant) {
        let mut last = self.last_write.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(now);
    }

    pub fn mark_write(&self) {
        self.mark_write_at(Instant::now());
    }

    /// True while `now` falls inside the window after the last own write
    pub fn suppresses(&self, now: Instant) -> bool {
        let last = self.last_write.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(at) => now.saturating_duration_since(at) < self.window,
            None => false,
        }
    }
}

/// Clipboard writer that registers every write with a [`SelfWriteGuard`]
pub struct GuardedWriter<W> {
    inner: W,
    guard: SelfWriteGuard,
}

impl<W: ClipboardWriter> GuardedWriter<W> {
    pub fn new(inner: W, guard: SelfWriteGuard) -> Self {
        Self { inner, guard }
    }

    pub fn write_result(&mut self, text: &str) -> anyhow::Result<()> {
        // Marked on both sides of the write, the OS may publish the change late
        self.guard.mark_write();
        let result = self.inner.set_text(text);
        self.guard.mark_write();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingWriter(Vec<String>);

    impl ClipboardWriter for RecordingWriter {
        fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_guard_window() {
        let guard = SelfWriteGuard::new(Duration::from_millis(800));
        let t0 = Instant::now();
        assert!(!guard.suppresses(t0));

        guard.mark_write_at(t0);
        assert!(guard.suppresses(t0 + Duration::from_millis(799)));
        assert!(!guard.suppresses(t0 + Duration::from_millis(800)));
    }

    #[test]
    fn test_guarded_writer_marks_guard() {
        let guard = SelfWriteGuard::new(Duration::from_secs(5));
        let mut writer = GuardedWriter::new(RecordingWriter(Vec::new()), guard.clone());

        writer.write_result("Hello").unwrap();

        assert!(guard.suppresses(Instant::now()));
        assert_eq!(writer.inner.0, vec!["Hello".to_string()]);
    }
}
