//! Small key-value store for state that must survive restarts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

/// Key under which the selected model id is persisted
pub const SELECTED_MODEL_KEY: &str = "selected_model_id";

pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value, persisting it before returning
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Settings kept in a flat JSON object on disk
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonSettingsStore {
    /// Open the store, a missing or unreadable file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings file {:?}: {}", path, e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            values: Mutex::new(values),
        }
    }

    /// Store under the platform data directory
    pub fn open_default() -> Self {
        Self::open(crate::data_dir().join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating settings directory {:?}", parent))?;
        }
        let data = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, data)
            .with_context(|| format!("writing settings file {:?}", self.path))?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }
}

/// Non-persistent store, used when the data directory is unavailable and in tests
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonSettingsStore::open(&path);
        assert_eq!(store.get(SELECTED_MODEL_KEY), None);
        store.set(SELECTED_MODEL_KEY, "gemma2:2b").unwrap();

        let reopened = JsonSettingsStore::open(&path);
        assert_eq!(reopened.get(SELECTED_MODEL_KEY).as_deref(), Some("gemma2:2b"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonSettingsStore::open(&path);
        assert_eq!(store.get(SELECTED_MODEL_KEY), None);

        store.set(SELECTED_MODEL_KEY, "x").unwrap();
        assert_eq!(JsonSettingsStore::open(&path).get(SELECTED_MODEL_KEY).as_deref(), Some("x"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySettingsStore::new();
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").as_deref(), Some("2"));
        assert_eq!(store.get("b"), None);
    }
}
