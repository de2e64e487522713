use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_double_copy_threshold_ms() -> u64 {
    600
}

fn default_self_write_suppression_ms() -> u64 {
    800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Watch the clipboard for the double-copy gesture
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Two copies closer than this trigger a translation
    #[serde(default = "default_double_copy_threshold_ms")]
    pub double_copy_threshold_ms: u64,
    /// Clipboard changes this soon after our own write are ignored
    #[serde(default = "default_self_write_suppression_ms")]
    pub self_write_suppression_ms: u64,
    /// Write finished translations back to the clipboard
    #[serde(default)]
    pub copy_result: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
            double_copy_threshold_ms: default_double_copy_threshold_ms(),
            self_write_suppression_ms: default_self_write_suppression_ms(),
            copy_result: false,
        }
    }
}
