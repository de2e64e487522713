//! Double-copy gesture detection over a polled clipboard revision counter.

use std::time::{Duration, Instant};

use crate::clipboard::{ClipboardSource, SelfWriteGuard};

/// Result of feeding one clipboard revision to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Revision did not move since the last tick
    Unchanged,
    /// A change with no recent predecessor, the gesture may follow
    FirstCopy,
    /// Second change inside the threshold
    DoubleCopy,
}

#[derive(Debug)]
pub struct DoubleCopyDetector {
    threshold: Duration,
    last_revision: Option<u64>,
    /// `None` means "never", so a fired gesture needs two fresh copies
    last_copy_at: Option<Instant>,
}

impl DoubleCopyDetector {
    pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(600);

    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_revision: None,
            last_copy_at: None,
        }
    }

    /// Feed the current revision. The first revision ever seen is the baseline
    /// and never counts as a copy.
    pub fn observe(&mut self, revision: u64, now: Instant) -> Observation {
        match self.last_revision {
            None => {
                self.last_revision = Some(revision);
                return Observation::Unchanged;
            }
            Some(last) if last == revision => return Observation::Unchanged,
            Some(_) => self.last_revision = Some(revision),
        }

        match self.last_copy_at {
            Some(previous) if now.saturating_duration_since(previous) < self.threshold => {
                self.last_copy_at = None;
                Observation::DoubleCopy
            }
            _ => {
                self.last_copy_at = Some(now);
                Observation::FirstCopy
            }
        }
    }

    /// Record a revision without counting it as a copy. A moved revision
    /// also drops any pending first copy.
    /// Returns true if the revision moved.
    pub fn absorb(&mut self, revision: u64) -> bool {
        let moved = self.last_revision.is_some_and(|last| last != revision);
        self.last_revision = Some(revision);
        if moved {
            self.last_copy_at = None;
        }
        moved
    }
}

impl Default for DoubleCopyDetector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

/// Couples a clipboard source with a detector and optional self-write guard
pub struct DoubleCopyWatcher<S> {
    source: S,
    detector: DoubleCopyDetector,
    guard: Option<SelfWriteGuard>,
}

impl<S: ClipboardSource> DoubleCopyWatcher<S> {
    pub fn new(source: S, detector: DoubleCopyDetector, guard: Option<SelfWriteGuard>) -> Self {
        Self {
            source,
            detector,
            guard,
        }
    }

    /// Run one tick. Returns the copied text when a double copy completes.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let revision = self.source.revision();

        if self.guard.as_ref().is_some_and(|guard| guard.suppresses(now)) {
            if self.detector.absorb(revision) {
                tracing::trace!("Ignoring clipboard change made by this process");
            }
            return None;
        }

        match self.detector.observe(revision, now) {
            Observation::DoubleCopy => {
                let text = self.source.text().filter(|text| !text.is_empty());
                if text.is_none() {
                    tracing::debug!("Double copy without plain text, ignoring");
                }
                text
            }
            Observation::FirstCopy => {
                tracing::trace!("Clipboard changed (revision {})", revision);
                None
            }
            Observation::Unchanged => None,
        }
    }
}
