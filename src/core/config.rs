//! Application configuration
//!
//! Persisted as pretty-printed JSON in the platform config directory.
//! Loading falls back to defaults when the file does not exist yet, and
//! every mutation path goes through `validate`.

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::core::models::DownloadConfig;

const QUALITIES: [&str; 3] = ["hd", "ld", "audio"];

/// Output defaults applied when the command line leaves them out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// One of "hd", "ld" or "audio"
    pub default_quality: String,
    /// Download directory; falls back to `download.output_directory`
    pub default_folder: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_quality: "hd".to_string(),
            default_folder: None,
        }
    }
}

/// Top-level persisted configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub download: DownloadConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Path of the config file in the platform config directory
    pub fn get_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "ytdownloader", "ytdl")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load the config file, or defaults when it does not exist
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let path = Self::get_config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, self.export()?)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Rewrite the config file with defaults
    pub fn reset() -> Result<Self> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Parse and validate a JSON config
    pub fn import(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=20).contains(&self.download.concurrent_downloads) {
            bail!("concurrent_downloads must be between 1 and 20");
        }
        if self.download.retry_attempts > 10 {
            bail!("retry_attempts must be at most 10");
        }
        if !(1..=300).contains(&self.download.timeout_seconds) {
            bail!("timeout_seconds must be between 1 and 300");
        }
        if self.download.output_directory.trim().is_empty() {
            bail!("output_directory must not be empty");
        }
        if !QUALITIES.contains(&self.output.default_quality.as_str()) {
            bail!(
                "default_quality must be one of {:?}, got \"{}\"",
                QUALITIES,
                self.output.default_quality
            );
        }
        Ok(())
    }

    /// Effective download folder, from output defaults or the download section
    pub fn download_folder(&self) -> PathBuf {
        match &self.output.default_folder {
            Some(folder) if !folder.trim().is_empty() => PathBuf::from(folder),
            _ => PathBuf::from(&self.download.output_directory),
        }
    }
}
