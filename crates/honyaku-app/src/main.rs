use std::sync::Arc;

use clap::Parser;
use honyaku_config::Config;
use tokio::signal;

mod controller;
mod events;
mod io;
mod logging;
mod profile;
mod state;
mod ui;

#[cfg(test)]
mod tests;

use self::controller::AppController;
use self::state::AppState;

/// Japanese/English translation with a local language model
#[derive(Parser, Debug)]
#[command(name = "honyaku", version)]
struct Cli {
    /// Profile to load from the config directory
    #[arg(long, default_value = "main")]
    profile: String,
    /// Select (and remember) a model by id
    #[arg(long)]
    model: Option<String>,
    /// Print the available models and exit
    #[arg(long)]
    list_models: bool,
    /// Don't watch the clipboard for the double-copy gesture
    #[arg(long)]
    no_clipboard: bool,
    /// Copy finished translations to the clipboard
    #[arg(long)]
    copy_result: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let cli = Cli::parse();

    if let Err(e) = profile::init_user_config() {
        tracing::warn!("Could not initialize user config: {:#}", e);
    }
    let mut config = profile::load_user_profile(&cli.profile).unwrap_or_else(|e| {
        tracing::warn!("Failed to load profile {}: {:#}, using defaults", cli.profile, e);
        Config::new()
    });
    config.apply_env_overrides();

    if cli.no_clipboard {
        config.clipboard.enabled = false;
    }
    if cli.copy_result {
        config.clipboard.copy_result = true;
    }

    let state = Arc::new(AppState::new(config)?);

    if cli.list_models {
        print!("{}", ui::model_list(&state.service));
        return Ok(());
    }
    if let Some(id) = cli.model.as_deref() {
        state.service.select_model(id)?;
    }

    let controller = AppController::new(state);
    let mut tasks = controller.spawn_tasks();

    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::warn!("task exited"),
                Ok(Err(e)) => tracing::error!("task failed: {:#}", e),
                Err(e) => tracing::error!("task panicked: {}", e),
            }
        }
    }

    controller.shutdown();
    tasks.shutdown().await;
    Ok(())
}
