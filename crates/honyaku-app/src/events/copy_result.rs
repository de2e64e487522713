use std::sync::Arc;

use honyaku_io::{ArboardClipboard, GuardedWriter};
use honyaku_types::{AppEvent, Notification};
use kanal::AsyncSender;

use crate::state::AppState;

/// Write text to the clipboard without retriggering the double-copy watcher
pub async fn write_clipboard(state: &AppState, text: String) -> anyhow::Result<()> {
    let guard = state.clipboard_guard.clone();
    tokio::task::spawn_blocking(move || {
        let clipboard = ArboardClipboard::new()?;
        GuardedWriter::new(clipboard, guard).write_result(&text)
    })
    .await?
}

pub async fn handle_copy_result(
    state: Arc<AppState>,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let output = state.service.snapshot().output;
    if output.is_empty() {
        app_to_ui_tx
            .send(AppEvent::Notify(Notification::info("Nothing to copy yet")))
            .await?;
        return Ok(());
    }

    let notification = match write_clipboard(&state, output).await {
        Ok(()) => Notification::info("Translation copied"),
        Err(e) => Notification::error(format!("Copy failed: {e:#}")),
    };
    app_to_ui_tx.send(AppEvent::Notify(notification)).await?;
    Ok(())
}
