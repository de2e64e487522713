use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use honyaku_io::{ArboardClipboard, ClipboardMonitor};
use honyaku_types::{AppEvent, TextSource};
use kanal::{AsyncSender, Sender};
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Watch the clipboard for the double-copy gesture until cancelled
pub async fn watcher_io(
    state: Arc<AppState>,
    cancel: CancellationToken,
    ui_to_app_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let clipboard = state.config.read().await.clipboard.clone();
    if !clipboard.enabled {
        tracing::info!("Clipboard watching disabled");
        cancel.cancelled().await;
        return Ok(());
    }

    let monitor = ClipboardMonitor::new(
        Duration::from_millis(clipboard.poll_interval_ms),
        Duration::from_millis(clipboard.double_copy_threshold_ms),
    )
    .with_guard(state.clipboard_guard.clone());

    // The callback runs on the polling thread
    let tx = ui_to_app_tx.clone_sync();
    monitor.on_double_copy(move |text| {
        let event = AppEvent::Translate {
            text,
            source: TextSource::Clipboard,
        };
        if let Err(e) = tx.send(event) {
            tracing::error!("Failed to forward clipboard text: {}", e);
        }
    });

    let handle = monitor.start(ArboardClipboard::new);

    cancel.cancelled().await;
    monitor.stop();
    if let Some(handle) = handle {
        handle.await?;
    }
    Ok(())
}

/// Turn a line typed on stdin into an event
///
/// Lines starting with `:` are commands, anything else is text to translate.
pub fn parse_input(line: &str) -> Option<AppEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(command) = trimmed.strip_prefix(':') else {
        return Some(AppEvent::Translate {
            text: trimmed.to_string(),
            source: TextSource::Manual,
        });
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    match (parts.next(), parts.next().map(str::trim)) {
        (Some("model"), Some(id)) if !id.is_empty() => Some(AppEvent::SelectModel(id.to_string())),
        (Some("load"), None) => Some(AppEvent::LoadModel),
        (Some("reset"), None) => Some(AppEvent::ResetModel),
        (Some("copy"), None) => Some(AppEvent::CopyResult),
        _ => {
            tracing::warn!("Unknown command: {}", trimmed);
            None
        }
    }
}

/// Read stdin on a dedicated thread, one event per line
pub fn spawn_stdin_reader(ui_to_app_tx: Sender<AppEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Stopped reading stdin: {}", e);
                    break;
                }
            };
            if let Some(event) = parse_input(&line) {
                if ui_to_app_tx.send(event).is_err() {
                    break;
                }
            }
        }
        tracing::debug!("Stdin closed");
    });
}
