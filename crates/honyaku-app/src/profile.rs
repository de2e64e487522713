use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use honyaku_config::Config;
use serde::{Deserialize, Serialize};

/// Load the default config shipped in the repo
fn load_repo_default_config() -> anyhow::Result<Config> {
    tracing::info!("Loading repo default config...");
    let file = File::open("config.json")?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

fn profiles_dir() -> PathBuf {
    honyaku_config::config_dir().join("profiles")
}

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

fn read_profile(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)?;
    let profile: Profile = serde_json::from_str(&data)?;
    Ok(profile.value)
}

/// Initialize user config folders and main profile if missing
pub fn init_user_config() -> anyhow::Result<()> {
    init_user_config_in(&profiles_dir())
}

fn init_user_config_in(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;

    let main_profile = dir.join("main.json");

    if !main_profile.exists() {
        // Use repo default as the initial main profile
        let default_config = load_repo_default_config().unwrap_or_else(|e| {
            tracing::debug!("No repo default config ({}), using built-in defaults", e);
            Config::new()
        });
        let profile = Profile {
            name: "main".into(),
            value: default_config,
        };
        fs::write(&main_profile, serde_json::to_string_pretty(&profile)?)?;
        tracing::info!("Created main profile at {:?}", main_profile);
    }

    Ok(())
}

/// Load a user profile by name, defaulting to main if name not found
pub fn load_user_profile(name: &str) -> anyhow::Result<Config> {
    load_user_profile_from(&profiles_dir(), name)
}

fn load_user_profile_from(dir: &Path, name: &str) -> anyhow::Result<Config> {
    let profile_file = dir.join(format!("{name}.json"));

    if profile_file.exists() {
        read_profile(&profile_file)
    } else {
        tracing::warn!("Profile {name} not found, falling back to main profile or repo default");
        let main_file = dir.join("main.json");
        if main_file.exists() {
            read_profile(&main_file)
        } else {
            // First-run fallback to repo default
            load_repo_default_config()
        }
    }
}
