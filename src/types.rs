//! # Conversion Types Module
//!
//! Tipi condivisi fra compiler, converter, batch e registry.
//!
//! ## Strutture dati:
//! - `InputFile`: file in memoria (nome + bytes + media type dichiarato)
//! - `ConversionOptions`: qualità 0-100, resize opzionale, bag `advanced`
//! - `ProgressUpdate`: tick di progresso 0-100 con stage e indice file
//! - `ConversionResult`: risultato terminale di una chiamata (mai mutato)
//! - `ConversionMetadata`: dimensioni, durata e rapporto di compressione

use crate::format::{self, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Progress callback. Invoked synchronously from the conversion's own task,
/// so implementations must return quickly.
pub type ProgressFn<'a> = dyn Fn(ProgressUpdate) + Send + Sync + 'a;

/// An in-memory input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Media type declared by whoever supplied the file, if any
    pub media_type: Option<String>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Read a file from disk; the file name becomes the input name
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Format detected from the name's extension, then from the declared media type
    pub fn format(&self) -> Option<FileFormat> {
        FileFormat::from_path(&self.name).or_else(|| {
            self.media_type
                .as_deref()
                .and_then(FileFormat::from_media_type)
        })
    }

    /// Declared media type, else the detected format's, else a generic octet stream
    pub fn effective_media_type(&self) -> String {
        match &self.media_type {
            Some(declared) => declared.clone(),
            None => format::media_type_for(self.format()).to_string(),
        }
    }

    /// Extension of the file name, if it has one
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.contains('/') {
            None
        } else {
            Some(ext)
        }
    }
}

/// Resize request. Zero dimensions are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `None` and `Some(true)` both preserve the aspect ratio
    pub maintain_aspect_ratio: Option<bool>,
}

/// Format-agnostic conversion options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    /// 0-100, higher is better. Values above 100 are clamped.
    pub quality: Option<u8>,
    pub resize: Option<ResizeOptions>,
    /// Unstable escape hatch: every entry is forwarded as a raw `-key value`
    /// encoder flag, in key order, right before the output path.
    #[serde(default)]
    pub advanced: BTreeMap<String, String>,
}

impl ConversionOptions {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: Some(quality),
            ..Default::default()
        }
    }
}

/// One progress tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// 0-100
    pub progress: u8,
    pub stage: Option<String>,
    /// 1-based index of the file being converted
    pub file: Option<usize>,
    pub total_files: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(progress: u8) -> Self {
        Self {
            progress: progress.min(100),
            stage: None,
            file: None,
            total_files: None,
        }
    }

    /// Clamp a fractional engine tick in [0.0, 1.0] to an integer percentage
    pub fn from_fraction(fraction: f64) -> Self {
        let percent = if fraction.is_finite() {
            (fraction * 100.0).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        Self::new(percent)
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

/// Bytes produced by a successful conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedData {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
    /// Suggested download name
    pub file_name: String,
}

/// Size and timing information for a finished conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetadata {
    pub original_size: u64,
    pub converted_size: u64,
    pub conversion_time: Duration,
    /// original / converted; `None` when the converted size is zero
    pub compression_ratio: Option<f64>,
}

impl ConversionMetadata {
    pub fn new(original_size: u64, converted_size: u64, conversion_time: Duration) -> Self {
        Self {
            original_size,
            converted_size,
            conversion_time,
            compression_ratio: compression_ratio(original_size, converted_size),
        }
    }
}

/// original / converted, undefined for a zero-byte output
pub fn compression_ratio(original_size: u64, converted_size: u64) -> Option<f64> {
    if converted_size == 0 {
        None
    } else {
        Some(original_size as f64 / converted_size as f64)
    }
}

/// Terminal outcome of one top-level conversion call
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub success: bool,
    pub data: Option<ConvertedData>,
    pub error: Option<String>,
    pub metadata: Option<ConversionMetadata>,
}

impl ConversionResult {
    pub fn success(data: ConvertedData, metadata: ConversionMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Some(metadata),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success && self.data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_format_detection() {
        let file = InputFile::new("IMG_0042.HEIC", vec![1, 2, 3]);
        assert_eq!(file.format(), Some(FileFormat::Heic));
        assert_eq!(file.extension(), Some("HEIC"));
        assert_eq!(file.size(), 3);

        let blob = InputFile::new("upload", vec![]).with_media_type("video/webm");
        assert_eq!(blob.format(), Some(FileFormat::Webm));
        assert_eq!(blob.extension(), None);

        assert_eq!(InputFile::new(".hidden", vec![]).extension(), None);
    }

    #[test]
    fn test_effective_media_type() {
        assert_eq!(InputFile::new("a.avif", vec![]).effective_media_type(), "image/avif");
        assert_eq!(
            InputFile::new("notes.txt", vec![]).effective_media_type(),
            "application/octet-stream"
        );
        let declared = InputFile::new("blob", vec![]).with_media_type("video/mp4");
        assert_eq!(declared.effective_media_type(), "video/mp4");
    }

    #[test]
    fn test_progress_from_fraction_is_clamped() {
        assert_eq!(ProgressUpdate::from_fraction(0.424).progress, 42);
        assert_eq!(ProgressUpdate::from_fraction(1.7).progress, 100);
        assert_eq!(ProgressUpdate::from_fraction(-0.2).progress, 0);
        assert_eq!(ProgressUpdate::from_fraction(f64::NAN).progress, 0);
    }

    #[test]
    fn test_compression_ratio_guards_zero() {
        assert_eq!(compression_ratio(1000, 250), Some(4.0));
        assert_eq!(compression_ratio(1000, 0), None);
        assert_eq!(compression_ratio(0, 10), Some(0.0));
    }

    #[test]
    fn test_failure_result() {
        let result = ConversionResult::failure("nope");
        assert!(!result.success);
        assert!(!result.is_success());
        assert_eq!(result.error.as_deref(), Some("nope"));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_options_deserialize_from_camel_case() {
        let options: ConversionOptions = serde_json::from_str(
            r#"{"quality": 75, "resize": {"width": 640, "maintainAspectRatio": false}}"#,
        )
        .unwrap();
        assert_eq!(options.quality, Some(75));
        let resize = options.resize.unwrap();
        assert_eq!(resize.width, Some(640));
        assert_eq!(resize.height, None);
        assert_eq!(resize.maintain_aspect_ratio, Some(false));
        assert!(options.advanced.is_empty());
    }
}
