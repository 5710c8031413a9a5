//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico della CLI.
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout per ogni evento
//! - I log `tracing` vanno su stderr, quindi stdout resta parsabile
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio conversione (file con media type e dimensione, formato, opzioni)
//! - `progress`: Tick di progresso (percentuale, stage, indice file)
//! - `complete`: Fine conversione con path di output e metadata
//! - `error`: Conversione fallita

use crate::format::FileFormat;
use crate::types::{ConversionMetadata, ConversionOptions, InputFile, ProgressUpdate};
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio della conversione
    #[serde(rename = "start")]
    Start {
        files: Vec<JsonInput>,
        output_format: FileFormat,
        options: ConversionOptions,
    },

    /// Progresso corrente
    #[serde(rename = "progress")]
    Progress {
        progress: u8,
        stage: Option<String>,
        file: Option<usize>,
        total_files: Option<usize>,
    },

    /// Conversione completata
    #[serde(rename = "complete")]
    Complete {
        output: PathBuf,
        media_type: String,
        original_size: u64,
        converted_size: u64,
        compression_ratio: Option<f64>,
        duration_seconds: f64,
    },

    /// Errore
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Input file descriptor for the `start` message
#[derive(Debug, Serialize)]
pub struct JsonInput {
    pub name: String,
    pub media_type: String,
    pub size: u64,
}

impl From<&InputFile> for JsonInput {
    fn from(file: &InputFile) -> Self {
        Self {
            name: file.name.clone(),
            media_type: file.effective_media_type(),
            size: file.size(),
        }
    }
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(files: &[InputFile], output_format: FileFormat, options: &ConversionOptions) -> Self {
        Self::Start {
            files: files.iter().map(JsonInput::from).collect(),
            output_format,
            options: options.clone(),
        }
    }

    pub fn progress(update: &ProgressUpdate) -> Self {
        Self::Progress {
            progress: update.progress,
            stage: update.stage.clone(),
            file: update.file,
            total_files: update.total_files,
        }
    }

    pub fn complete(output: PathBuf, media_type: &str, metadata: &ConversionMetadata) -> Self {
        Self::Complete {
            output,
            media_type: media_type.to_string(),
            original_size: metadata.original_size,
            converted_size: metadata.converted_size,
            compression_ratio: metadata.compression_ratio,
            duration_seconds: metadata.conversion_time.as_secs_f64(),
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_progress_message_shape() {
        let update = ProgressUpdate {
            file: Some(1),
            total_files: Some(2),
            ..ProgressUpdate::new(25).with_stage("processing")
        };
        let json = serde_json::to_value(JsonMessage::progress(&update)).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["progress"], 25);
        assert_eq!(json["stage"], "processing");
        assert_eq!(json["total_files"], 2);
    }

    #[test]
    fn test_complete_message_carries_metadata() {
        let metadata = ConversionMetadata::new(1000, 0, Duration::from_secs(2));
        let message = JsonMessage::complete(PathBuf::from("out.zip"), "application/zip", &metadata);
        let json = serde_json::to_value(message).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["original_size"], 1000);
        assert!(json["compression_ratio"].is_null());
        assert_eq!(json["duration_seconds"], 2.0);
    }

    #[test]
    fn test_start_message_serializes_format_lowercase() {
        let message = JsonMessage::start(
            &[InputFile::new("a.heic", vec![0u8; 3])],
            FileFormat::Jpg,
            &ConversionOptions::with_quality(80),
        );
        let json = serde_json::to_value(message).unwrap();
        assert_eq!(json["output_format"], "jpg");
        assert_eq!(json["options"]["quality"], 80);
        assert_eq!(json["files"][0]["media_type"], "image/heic");
        assert_eq!(json["files"][0]["size"], 3);
    }
}
