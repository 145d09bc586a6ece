use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "granola-client";
const GRANOLA_DIR: &str = "Granola";
const CREDENTIALS_FILE: &str = "supabase.json";

pub struct AppPaths;

impl AppPaths {
    /// `<home>/Library/Application Support/Granola`, where the desktop app keeps its state
    pub fn granola_support_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home
            .join("Library")
            .join("Application Support")
            .join(GRANOLA_DIR))
    }

    pub fn credentials_file() -> Result<PathBuf> {
        Ok(Self::granola_support_dir()?.join(CREDENTIALS_FILE))
    }

    pub fn config_file() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Cannot determine config directory"))?;
        Ok(config_dir.join(APP_NAME).join("config.toml"))
    }

    pub fn log_dir() -> Result<PathBuf> {
        let log_dir = dirs::data_local_dir()
            .or_else(dirs::cache_dir)
            .ok_or_else(|| anyhow!("Cannot determine data directory"))?
            .join(APP_NAME)
            .join("logs");

        fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }
}
