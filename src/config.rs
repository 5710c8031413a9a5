//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione runtime del converter.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri dell'engine e del batch
//! - Fornisce validazione dei parametri
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `ffmpeg_path` / `ffprobe_path`: path espliciti degli eseguibili (default: risolti dal sistema)
//! - `archive_compression_level`: livello deflate degli archivi batch (0-9, default: 6)
//! - `default_quality`: qualità usata quando la richiesta non ne specifica una (0-100)
//! - `output_path`: file o directory di output della CLI (default: accanto all'input)
//! - `json_output`: eventi JSON-lines invece della progress bar (default: false)
//!
//! ## Esempio:
//! ```rust
//! use media_converter::Config;
//!
//! let config = Config {
//!     archive_compression_level: 9,
//!     default_quality: Some(85),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::converter::DEFAULT_ARCHIVE_LEVEL;
use crate::types::ConversionOptions;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit ffmpeg executable
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe executable
    pub ffprobe_path: Option<PathBuf>,
    /// Deflate level for batch archives (0-9)
    pub archive_compression_level: u8,
    /// Quality applied when a request carries none (0-100)
    pub default_quality: Option<u8>,
    /// Output file or directory for converted results
    pub output_path: Option<PathBuf>,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            archive_compression_level: DEFAULT_ARCHIVE_LEVEL,
            default_quality: None,
            output_path: None,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.archive_compression_level > 9 {
            return Err(anyhow::anyhow!(
                "Archive compression level must be between 0 and 9"
            ));
        }

        if let Some(quality) = self.default_quality {
            if quality > 100 {
                return Err(anyhow::anyhow!("Default quality must be between 0 and 100"));
            }
        }

        for (tool, path) in [("ffmpeg", &self.ffmpeg_path), ("ffprobe", &self.ffprobe_path)] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(anyhow::anyhow!(
                        "Configured {} does not exist: {}",
                        tool,
                        path.display()
                    ));
                }
            }
        }

        Ok(())
    }

    /// Fill in the configured default quality when `options` has none
    pub fn apply_defaults(&self, mut options: ConversionOptions) -> ConversionOptions {
        if options.quality.is_none() {
            options.quality = self.default_quality;
        }
        options
    }

    /// `~/.media-converter/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".media-converter").join("config.json"))
    }

    /// Load configuration from file; a missing file yields the defaults
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
