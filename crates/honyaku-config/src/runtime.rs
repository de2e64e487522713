use std::env;

use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_keep_alive() -> String {
    "10m".to_string()
}

fn default_cache_limit_bytes() -> u64 {
    400 * 1024 * 1024
}

/// Connection to the local inference runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Applies to connecting and receiving response headers, not to streaming
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// How long the runtime keeps the model resident after a request
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
    /// Upper bound handed to the runtime before loading a session
    #[serde(default = "default_cache_limit_bytes")]
    pub cache_limit_bytes: u64,
}

pub const RUNTIME_URL_ENV: &str = "HONYAKU_RUNTIME_URL";
pub const CACHE_LIMIT_ENV: &str = "HONYAKU_CACHE_LIMIT_BYTES";

impl RuntimeConfig {
    pub fn new() -> Self {
        let mut config = Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            keep_alive: default_keep_alive(),
            cache_limit_bytes: default_cache_limit_bytes(),
        };
        config.apply_env_overrides();
        config
    }

    /// Environment wins over values read from a profile
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(RUNTIME_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url;
        }

        if let Some(raw) = lookup(CACHE_LIMIT_ENV) {
            match raw.trim().parse() {
                Ok(bytes) => self.cache_limit_bytes = bytes,
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", CACHE_LIMIT_ENV, raw, e),
            }
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
