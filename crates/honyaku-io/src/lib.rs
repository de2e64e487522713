pub mod clipboard;
pub mod detector;
pub mod monitor;

pub use clipboard::{ArboardClipboard, ClipboardSource, ClipboardWriter, GuardedWriter, SelfWriteGuard};
pub use detector::{DoubleCopyDetector, DoubleCopyWatcher, Observation};
pub use monitor::ClipboardMonitor;
