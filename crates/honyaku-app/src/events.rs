use std::sync::Arc;

use honyaku_types::{AppEvent, Notification};
use kanal::{AsyncReceiver, AsyncSender};

use crate::state::AppState;

pub mod copy_result;
pub mod load_model;
pub mod translate;

use copy_result::handle_copy_result;
use load_model::spawn_model_load;
use translate::handle_translate;

/// App's main loop
pub async fn event_loop(
    state: Arc<AppState>,
    ui_to_app_rx: AsyncReceiver<AppEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    // Start preparing the selected model right away
    spawn_model_load(state.clone(), app_to_ui_tx.clone());
    app_to_ui_tx.send(AppEvent::BackendReady).await?;

    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    loop {
        let event = ui_to_app_rx.recv().await?;

        tracing::debug!(
            "[EVENT_LOOP] EVENT RECEIVED: {:?}",
            std::mem::discriminant(&event)
        );
        handle_events(state.clone(), &app_to_ui_tx, event).await?;
    }
}

async fn handle_events(
    state: Arc<AppState>,
    app_to_ui_tx: &AsyncSender<AppEvent>,
    event: AppEvent,
) -> anyhow::Result<()> {
    match event {
        AppEvent::Translate { text, source } => {
            if text.trim().is_empty() {
                tracing::debug!("Ignoring empty input from {:?}", source);
                return Ok(());
            }
            // Translations run off the loop so reset and selection stay responsive
            let tx = app_to_ui_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_translate(state, text, source, &tx).await {
                    tracing::error!("Translate task failed: {:#}", e);
                }
            });
        }
        AppEvent::SelectModel(id) => match state.service.select_model(&id) {
            Ok(true) => {
                let model = state.service.selected_model();
                app_to_ui_tx
                    .send(AppEvent::Notify(Notification::info(format!(
                        "Switched to {}",
                        model.display_name
                    ))))
                    .await?;
                spawn_model_load(state, app_to_ui_tx.clone());
            }
            Ok(false) => {
                tracing::debug!("Model {} already selected", id);
            }
            Err(e) => {
                app_to_ui_tx
                    .send(AppEvent::Notify(Notification::error(e.to_string())))
                    .await?;
            }
        },
        AppEvent::LoadModel => {
            spawn_model_load(state, app_to_ui_tx.clone());
        }
        AppEvent::ResetModel => {
            state.service.reset_model();
            app_to_ui_tx
                .send(AppEvent::Notify(Notification::info("Model unloaded")))
                .await?;
        }
        AppEvent::CopyResult => {
            handle_copy_result(state, app_to_ui_tx).await?;
        }
        AppEvent::Notify(_) | AppEvent::BackendReady => {
            // UI-only events, ignore in backend
        }
    }

    Ok(())
}
