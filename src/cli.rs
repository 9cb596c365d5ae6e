//! Command line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::models::DownloadOption;

/// YouTube video and playlist downloader
#[derive(Debug, Parser)]
#[command(name = "ytdl", version, about = "Download YouTube videos and playlists")]
pub struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show metadata and available quality options for a URL
    Info {
        /// Video or playlist URL
        url: String,
    },

    /// Download one or more video or playlist URLs
    Download {
        /// Video or playlist URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Quality to download
        #[arg(short, long, value_enum)]
        quality: Option<Quality>,

        /// Directory to download into
        #[arg(short, long)]
        folder: Option<PathBuf>,
    },

    /// Manage the persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Print the config file path
    Path,
    /// Restore the default configuration
    Reset,
}

/// Download quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Quality {
    /// 720p progressive video
    Hd,
    /// 360p progressive video
    Ld,
    /// Audio only at 128kbps
    Audio,
}

impl Quality {
    pub fn option(self) -> DownloadOption {
        match self {
            Quality::Hd => DownloadOption::hd(),
            Quality::Ld => DownloadOption::ld(),
            Quality::Audio => DownloadOption::audio(),
        }
    }

    /// Parse a config-file quality name, defaulting to HD
    pub fn from_config_name(name: &str) -> Self {
        match name {
            "ld" => Quality::Ld,
            "audio" => Quality::Audio,
            _ => Quality::Hd,
        }
    }
}
