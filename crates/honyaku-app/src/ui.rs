use std::io::Write;
use std::sync::Arc;

use honyaku_core::{LoadState, ServiceSnapshot, TranslationService};
use honyaku_types::{AppEvent, Notification, NotificationLevel};
use kanal::AsyncReceiver;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Renders service snapshots as a terminal transcript
#[derive(Debug, Default)]
pub struct TerminalView {
    load_state: Option<LoadState>,
    load_percent: Option<u32>,
    generating: bool,
    /// Output already written for the current request
    printed: String,
    /// A `> ` line is open and not yet terminated
    line_open: bool,
}

impl TerminalView {
    pub fn render(&mut self, snapshot: &ServiceSnapshot, out: &mut impl Write) -> std::io::Result<()> {
        match snapshot.load_progress {
            Some(progress) => {
                let percent = (progress.clamp(0.0, 1.0) * 100.0) as u32;
                if self.load_percent != Some(percent) {
                    write!(out, "\rPreparing model... {percent}%")?;
                    self.load_percent = Some(percent);
                }
            }
            None => {
                if self.load_percent.take().is_some() {
                    writeln!(out)?;
                }
            }
        }

        if self.load_state != Some(snapshot.load_state) {
            if snapshot.load_state == LoadState::Loaded {
                writeln!(out, "Model ready: {}", snapshot.selected_model_id)?;
            }
            self.load_state = Some(snapshot.load_state);
        }

        if snapshot.is_generating && !self.generating {
            self.printed.clear();
            if self.line_open {
                writeln!(out)?;
            }
            write!(out, "> ")?;
            self.line_open = true;
        }

        // Output only grows during a request. Anything else is a reset or a
        // new request whose start was coalesced away.
        if !snapshot.output.starts_with(self.printed.as_str()) {
            if self.line_open && !self.printed.is_empty() {
                writeln!(out)?;
                self.line_open = false;
            }
            self.printed.clear();
        }
        let delta = &snapshot.output[self.printed.len()..];
        if !delta.is_empty() {
            if !self.line_open {
                write!(out, "> ")?;
                self.line_open = true;
            }
            write!(out, "{delta}")?;
            self.printed.push_str(delta);
        }

        if !snapshot.is_generating && self.generating && self.line_open {
            writeln!(out)?;
            self.line_open = false;
        }
        self.generating = snapshot.is_generating;

        out.flush()
    }

    pub fn notify(&self, notification: &Notification, out: &mut impl Write) -> std::io::Result<()> {
        match notification.level {
            NotificationLevel::Info => writeln!(out, "[info] {}", notification.message),
            NotificationLevel::Error => writeln!(out, "[error] {}", notification.message),
        }
    }
}

/// One line per registered model, the selected one marked with `*`
pub fn model_list(service: &TranslationService) -> String {
    let selected = service.selected_model();
    service
        .registry()
        .iter()
        .map(|model| {
            let marker = if model.id == selected.id { '*' } else { ' ' };
            format!(
                "{marker} {}\t{}\t{}\n",
                model.id, model.display_name, model.description
            )
        })
        .collect()
}

pub async fn ui_loop(
    state: Arc<AppState>,
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut snapshots = state.service.subscribe();
    let mut view = TerminalView::default();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                view.render(&snapshot, &mut std::io::stdout())?;
            }
            event = app_to_ui_rx.recv() => match event? {
                AppEvent::Notify(notification) => {
                    view.notify(&notification, &mut std::io::stdout())?;
                }
                AppEvent::BackendReady => {
                    let model = state.service.selected_model();
                    println!("honyaku ready ({}). Type text, or copy twice quickly.", model.display_name);
                }
                _ => {}
            },
        }
    }

    Ok(())
}
