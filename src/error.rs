//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `ConvertError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `UnsupportedPair`: nessun convertitore dichiara la coppia (input, output)
//! - `EngineInit`: il codec engine non si è inizializzato
//! - `Staging`: scrittura/lettura nel working namespace dell'engine fallita
//! - `Encode`: esecuzione del comando compilato fallita
//! - `BatchAbort`: un file di un batch è fallito, nessun archivio prodotto
//! - `Archive`: impacchettamento zip fallito
//!
//! ## Confine pubblico:
//! Questi errori non attraversano mai `convert_one` / `convert_many`: vengono
//! convertiti in `ConversionResult::failure` al confine.
//!
//! ## Esempio:
//! ```rust
//! use media_converter::{error::ConvertError, format::FileFormat};
//!
//! let err = ConvertError::UnsupportedPair { input: FileFormat::Heic, output: FileFormat::Mp4 };
//! assert_eq!(err.to_string(), "Conversion from heic to mp4 is not supported");
//! ```

use crate::format::FileFormat;

/// Custom error types for media conversion
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Conversion from {input} to {output} is not supported")]
    UnsupportedPair {
        input: FileFormat,
        output: FileFormat,
    },

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error("Failed to initialize codec engine: {0}")]
    EngineInit(String),

    #[error("Engine working namespace error: {0}")]
    Staging(String),

    #[error("Encoding failed: {reason}")]
    Encode {
        reason: String,
        stderr: Option<String>,
    },

    #[error("Failed to convert file {file}")]
    BatchAbort { file: String },

    #[error("No files to convert")]
    EmptyBatch,

    #[error("Archive packaging error: {0}")]
    Archive(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConvertError {
    /// Creates an encode error carrying the engine's diagnostic output
    pub fn encode(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
            stderr,
        }
    }

    /// Message surfaced in a failed `ConversionResult`.
    ///
    /// Encode failures include the engine's stderr tail when available.
    pub fn result_message(&self) -> String {
        match self {
            Self::Encode {
                reason,
                stderr: Some(stderr),
            } if !stderr.trim().is_empty() => {
                format!("Encoding failed: {}: {}", reason, stderr.trim())
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_abort_message() {
        let err = ConvertError::BatchAbort {
            file: "b.png".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to convert file b.png");
    }

    #[test]
    fn test_result_message_includes_stderr() {
        let err = ConvertError::encode("ffmpeg exited with status 1", Some("Invalid data\n".into()));
        assert_eq!(
            err.result_message(),
            "Encoding failed: ffmpeg exited with status 1: Invalid data"
        );

        let bare = ConvertError::encode("boom", None);
        assert_eq!(bare.result_message(), "Encoding failed: boom");
    }
}
