use std::sync::Arc;

use honyaku_core::TranslateError;
use honyaku_types::{AppEvent, Notification, TextSource};
use kanal::AsyncSender;

use crate::events::copy_result::write_clipboard;
use crate::state::AppState;

pub async fn handle_translate(
    state: Arc<AppState>,
    text: String,
    source: TextSource,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::info!(
        "Translating {} chars from {:?}",
        text.chars().count(),
        source
    );

    match state.service.translate(&text).await {
        Ok(result) => {
            let copy_result = state.config.read().await.clipboard.copy_result;
            if copy_result && !result.is_empty() {
                if let Err(e) = write_clipboard(&state, result).await {
                    tracing::warn!("Could not copy translation: {:#}", e);
                }
            }
        }
        Err(TranslateError::Busy) => {
            app_to_ui_tx
                .send(AppEvent::Notify(Notification::info(
                    "A translation is already running",
                )))
                .await?;
        }
        Err(TranslateError::Superseded) | Err(TranslateError::Cancelled) => {
            tracing::debug!("Translation stopped before completion");
        }
        Err(e) => {
            app_to_ui_tx
                .send(AppEvent::Notify(Notification::error(e.to_string())))
                .await?;
        }
    }

    Ok(())
}
