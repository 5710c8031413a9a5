//! # File Management Module
//!
//! Questo modulo gestisce le operazioni su filesystem della CLI.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva (`walkdir`) dei file convertibili verso un formato
//! - Calcolo dei path di output (file singolo o archivio batch)
//! - Scrittura dei risultati, creando le directory mancanti
//! - Formattazione human-readable delle dimensioni
//!
//! ## Regole di discovery:
//! - Un file passato esplicitamente viene sempre incluso, così un formato non
//!   supportato produce un errore esplicito invece di essere ignorato
//! - Dentro una directory vengono inclusi solo i file il cui formato ha un
//!   converter verso il formato di destinazione
//!
//! ## Esempio:
//! ```rust
//! use media_converter::file_manager::FileManager;
//!
//! assert_eq!(FileManager::format_size(1536), "1.50 KB");
//! ```

use crate::batch::ARCHIVE_NAME;
use crate::format::FileFormat;
use crate::registry::ConverterRegistry;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Filesystem helpers for the command-line front end
pub struct FileManager;

impl FileManager {
    /// Expand `inputs` into the list of files to convert to `target`
    pub fn find_convertible_files(
        inputs: &[PathBuf],
        registry: &ConverterRegistry,
        target: FileFormat,
    ) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_file() {
                files.push(input.clone());
                continue;
            }
            if !input.is_dir() {
                return Err(anyhow::anyhow!("Input does not exist: {}", input.display()));
            }

            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|path| {
                    FileFormat::from_path(path)
                        .map(|format| registry.is_supported(format, target))
                        .unwrap_or(false)
                })
                .collect();
            found.sort();
            debug!("Found {} convertible files in {}", found.len(), input.display());
            files.extend(found);
        }

        Ok(files)
    }

    /// Destination of a single converted file.
    ///
    /// An existing directory receives `<stem>.<ext>`; any other explicit path is
    /// used as is. Without one the result lands next to the input, never on top of it.
    pub fn output_path_for(input: &Path, target: FileFormat, output: Option<&Path>) -> PathBuf {
        let file_name = Self::converted_file_name(input, target);
        match output {
            Some(dir) if dir.is_dir() => dir.join(file_name),
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = input.with_file_name(&file_name);
                if candidate == input {
                    let stem = input
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    input.with_file_name(format!("{}_converted.{}", stem, target.extension()))
                } else {
                    candidate
                }
            }
        }
    }

    /// Destination of a batch archive
    pub fn archive_path(output: Option<&Path>) -> PathBuf {
        match output {
            Some(dir) if dir.is_dir() => dir.join(ARCHIVE_NAME),
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(ARCHIVE_NAME),
        }
    }

    fn converted_file_name(input: &Path, target: FileFormat) -> String {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        crate::batch::converted_name(&name, target)
    }

    /// Write converted bytes, creating parent directories
    pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, bytes).await?;
        Ok(())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
