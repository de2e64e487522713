use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Translate text coming from the clipboard gesture or manual entry
    Translate {
        text: String,
        source: TextSource,
    },
    /// Switch the active model (persisted)
    SelectModel(String),
    LoadModel,
    ResetModel,
    /// Put the last translation on the clipboard
    CopyResult,
    Notify(Notification),
    BackendReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Clipboard,
    Manual,
}

/// One-shot, dismissible message for the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// A selectable inference backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Identifier understood by the inference runtime
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// The model only translates when told the target language
    #[serde(default)]
    pub requires_system_prompt: bool,
    /// Generic chat models need to be told to drop commentary
    #[serde(default)]
    pub needs_strict_output_instruction: bool,
}
