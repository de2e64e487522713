use std::sync::Arc;

use honyaku_core::TranslateError;
use honyaku_types::{AppEvent, Notification};
use kanal::AsyncSender;

use crate::state::AppState;

pub fn spawn_model_load(state: Arc<AppState>, app_to_ui_tx: AsyncSender<AppEvent>) {
    tokio::spawn(async move {
        if let Err(e) = handle_model_load(state, &app_to_ui_tx).await {
            tracing::error!("Model load task failed: {:#}", e);
        }
    });
}

pub async fn handle_model_load(
    state: Arc<AppState>,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    match state.service.load_model().await {
        Ok(()) => {}
        Err(TranslateError::Superseded) => {
            tracing::debug!("Model load superseded by a reset");
        }
        Err(e) => {
            app_to_ui_tx
                .send(AppEvent::Notify(Notification::error(e.to_string())))
                .await?;
        }
    }
    Ok(())
}
