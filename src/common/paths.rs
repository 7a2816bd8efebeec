use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for qavid

/// Get the main qavid config directory
pub fn qavid_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("qavid");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default location of the video settings file
pub fn video_config_path() -> Result<PathBuf> {
    Ok(qavid_config_dir()?.join("video.toml"))
}
