//! # Converter Module
//!
//! Un `Converter` possiede una sessione del codec engine e converte file di una
//! famiglia di media (immagini o video).
//!
//! ## Ciclo di vita di `convert_one`:
//! 1. Inizializzazione lazy dell'engine (una sola volta per istanza)
//! 2. Compilazione del comando (`command::compile`)
//! 3. Staging dell'input con nome univoco per chiamata
//! 4. Progress: `0` iniziale, tick dell'engine clampati a 0-100, `100` finale
//! 5. Esecuzione, lettura output, cleanup di input e output in ogni caso
//! 6. Metadata: dimensioni, durata, rapporto di compressione
//!
//! Nessun errore esce da `convert_one` / `convert_many`: ogni fallimento diventa
//! `ConversionResult { success: false, error }`.
//!
//! ## Batch:
//! `convert_many` con un solo file delega a `convert_one`; con più file i file
//! sono convertiti in sequenza e impacchettati in un archivio zip (vedi `batch`).

use crate::archive::ZipPackager;
use crate::batch;
use crate::command;
use crate::engine::CodecEngine;
use crate::error::{ConvertError, Result};
use crate::format::{FileFormat, MediaFamily};
use crate::types::{
    ConversionMetadata, ConversionOptions, ConversionResult, ConvertedData, InputFile,
    ProgressFn, ProgressUpdate,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Default deflate level for batch archives
pub const DEFAULT_ARCHIVE_LEVEL: u8 = 6;

const IMAGE_FORMATS: &[FileFormat] = &[
    FileFormat::Jpg,
    FileFormat::Jpeg,
    FileFormat::Png,
    FileFormat::Heic,
    FileFormat::Avif,
    FileFormat::Webp,
];

const VIDEO_FORMATS: &[FileFormat] = &[
    FileFormat::Mp4,
    FileFormat::Webm,
    FileFormat::Mov,
    FileFormat::Avi,
    FileFormat::Mkv,
];

/// Formats a family's converter accepts and produces
pub fn family_formats(family: MediaFamily) -> &'static [FileFormat] {
    match family {
        MediaFamily::Image => IMAGE_FORMATS,
        MediaFamily::Video => VIDEO_FORMATS,
        MediaFamily::Document => &[],
    }
}

/// Converts files of one media family through its own engine session
pub struct Converter {
    family: MediaFamily,
    input_formats: &'static [FileFormat],
    output_formats: &'static [FileFormat],
    engine: Arc<dyn CodecEngine>,
    ready: OnceCell<()>,
    sequence: AtomicU64,
    archive_level: u8,
}

impl Converter {
    pub fn new(family: MediaFamily, engine: Arc<dyn CodecEngine>) -> Self {
        let formats = family_formats(family);
        Self {
            family,
            input_formats: formats,
            output_formats: formats,
            engine,
            ready: OnceCell::new(),
            sequence: AtomicU64::new(0),
            archive_level: DEFAULT_ARCHIVE_LEVEL,
        }
    }

    pub fn image(engine: Arc<dyn CodecEngine>) -> Self {
        Self::new(MediaFamily::Image, engine)
    }

    pub fn video(engine: Arc<dyn CodecEngine>) -> Self {
        Self::new(MediaFamily::Video, engine)
    }

    /// Deflate level used when packaging batches (clamped to 0-9)
    pub fn with_archive_level(mut self, level: u8) -> Self {
        self.archive_level = level.min(9);
        self
    }

    pub fn family(&self) -> MediaFamily {
        self.family
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn input_formats(&self) -> &'static [FileFormat] {
        self.input_formats
    }

    pub fn output_formats(&self) -> &'static [FileFormat] {
        self.output_formats
    }

    /// Family-level capability test; identity pairs are included
    pub fn supports(&self, from: FileFormat, to: FileFormat) -> bool {
        self.input_formats.contains(&from) && self.output_formats.contains(&to)
    }

    /// Convert a single file. Never panics or propagates: failures come back
    /// as `success: false` results.
    pub async fn convert_one(
        &self,
        file: &InputFile,
        output_format: FileFormat,
        options: &ConversionOptions,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> ConversionResult {
        match self
            .try_convert_one(file, output_format, options, on_progress)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Conversion of {} to {} failed: {}", file.name, output_format, e);
                ConversionResult::failure(e.result_message())
            }
        }
    }

    /// Convert one or more files. Several files are converted one at a time and
    /// returned as a single zip archive; any failure fails the whole batch.
    pub async fn convert_many(
        &self,
        files: &[InputFile],
        output_format: FileFormat,
        options: &ConversionOptions,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> ConversionResult {
        match files {
            [] => ConversionResult::failure(ConvertError::EmptyBatch.to_string()),
            [single] => {
                self.convert_one(single, output_format, options, on_progress)
                    .await
            }
            _ => {
                batch::run(
                    self,
                    files,
                    output_format,
                    options,
                    on_progress,
                    ZipPackager::new(),
                    self.archive_level,
                )
                .await
            }
        }
    }

    async fn ensure_initialized(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                debug!("Initializing {} engine for {} converter", self.engine.name(), self.family);
                self.engine.initialize().await.map_err(|e| match e {
                    ConvertError::EngineInit(_) => e,
                    other => ConvertError::EngineInit(other.to_string()),
                })
            })
            .await
            .map(|_| ())
    }

    /// Unique working-namespace names for one call
    fn staged_names(&self, file: &InputFile, output_format: FileFormat) -> (String, String) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let input_ext = file
            .extension()
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .or_else(|| file.format().map(|f| f.extension().to_string()))
            .unwrap_or_else(|| "bin".to_string());

        (
            format!("input_{}_{}.{}", stamp, seq, input_ext),
            format!("output_{}_{}.{}", stamp, seq, output_format.extension()),
        )
    }

    async fn try_convert_one(
        &self,
        file: &InputFile,
        output_format: FileFormat,
        options: &ConversionOptions,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<ConversionResult> {
        self.ensure_initialized().await?;

        match file.format() {
            Some(input_format) if !self.supports(input_format, output_format) => {
                return Err(ConvertError::UnsupportedPair {
                    input: input_format,
                    output: output_format,
                });
            }
            None if !self.output_formats.contains(&output_format) => {
                return Err(ConvertError::Validation(format!(
                    "{} converter cannot produce {}",
                    self.family, output_format
                )));
            }
            _ => {}
        }

        let start = Instant::now();
        if let Some(emit) = on_progress {
            emit(ProgressUpdate::new(0));
        }

        let (input_name, output_name) = self.staged_names(file, output_format);
        let command = command::compile(&input_name, &output_name, output_format, options);
        debug!("Compiled command for {}: {:?}", file.name, command);

        let forward = |fraction: f64| {
            if let Some(emit) = on_progress {
                emit(ProgressUpdate::from_fraction(fraction).with_stage("processing"));
            }
        };

        let outcome = async {
            self.engine.stage_input(&input_name, &file.bytes).await?;
            self.engine.execute(&command, &forward).await?;
            self.engine.read_output(&output_name).await
        }
        .await;

        // cleanup runs on every path so the namespace never accumulates files
        for name in [&input_name, &output_name] {
            if let Err(e) = self.engine.remove_staged(name).await {
                warn!("Failed to remove staged file {}: {}", name, e);
            }
        }

        let bytes = outcome?;

        let metadata = ConversionMetadata::new(file.size(), bytes.len() as u64, start.elapsed());
        debug!(
            "Converted {} ({} -> {} bytes) in {:?}",
            file.name, metadata.original_size, metadata.converted_size, metadata.conversion_time
        );

        if let Some(emit) = on_progress {
            emit(ProgressUpdate::new(100));
        }

        Ok(ConversionResult::success(
            ConvertedData {
                bytes,
                media_type: output_format.media_type(),
                file_name: batch::converted_name(&file.name, output_format),
            },
            metadata,
        ))
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("family", &self.family)
            .field("engine", &self.engine.name())
            .field("archive_level", &self.archive_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockEngine, CORRUPT_MARKER};
    use std::sync::Mutex;

    fn image_converter() -> (Converter, Arc<MockEngine>) {
        let engine = Arc::new(MockEngine::new());
        (Converter::image(engine.clone()), engine)
    }

    fn collect() -> (Arc<Mutex<Vec<ProgressUpdate>>>, impl Fn(ProgressUpdate) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |update: ProgressUpdate| sink.lock().unwrap().push(update))
    }

    #[test]
    fn test_supports_is_family_level() {
        let (converter, _) = image_converter();
        assert!(converter.supports(FileFormat::Heic, FileFormat::Jpg));
        assert!(converter.supports(FileFormat::Png, FileFormat::Webp));
        assert!(converter.supports(FileFormat::Jpg, FileFormat::Jpg));
        assert!(!converter.supports(FileFormat::Jpg, FileFormat::Mp4));
        assert!(!converter.supports(FileFormat::Pdf, FileFormat::Jpg));
    }

    #[tokio::test]
    async fn test_convert_one_jpg_quality_80() {
        let (converter, engine) = image_converter();
        let input = InputFile::new("photo.heic", vec![7u8; 1_000_000]);

        let result = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::with_quality(80), None)
            .await;

        assert!(result.is_success(), "{:?}", result.error);
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.original_size, 1_000_000);
        assert_eq!(metadata.converted_size, 4 + 500_000);
        assert!(metadata.compression_ratio.unwrap() > 1.9);

        let data = result.data.unwrap();
        assert_eq!(data.media_type, "image/jpeg");
        assert_eq!(data.file_name, "photo.jpg");

        let command = &engine.commands()[0];
        let q = command.iter().position(|a| a == "-q:v").unwrap();
        assert_eq!(command[q + 1], "8");
    }

    #[tokio::test]
    async fn test_engine_initialized_once() {
        let (converter, engine) = image_converter();
        let input = InputFile::new("a.png", b"pngdata".to_vec());
        for _ in 0..3 {
            let result = converter
                .convert_one(&input, FileFormat::Webp, &ConversionOptions::default(), None)
                .await;
            assert!(result.success);
        }
        assert_eq!(engine.init_calls(), 1);
    }

    #[tokio::test]
    async fn test_init_failure_is_reported_not_raised() {
        let engine = Arc::new(MockEngine::failing_init(1));
        let converter = Converter::image(engine.clone());
        let input = InputFile::new("a.png", b"pngdata".to_vec());

        let failed = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), None)
            .await;
        assert!(!failed.success);
        assert!(failed.error.unwrap().contains("initialize"));

        // a later call may retry initialization
        let ok = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), None)
            .await;
        assert!(ok.success);
        assert_eq!(engine.init_calls(), 2);
    }

    #[tokio::test]
    async fn test_progress_starts_at_zero_and_ends_at_100() {
        let (converter, _) = image_converter();
        let (seen, sink) = collect();
        let input = InputFile::new("a.avif", b"avifdata".to_vec());

        let result = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), Some(&sink))
            .await;
        assert!(result.success);

        let progress: Vec<u8> = seen.lock().unwrap().iter().map(|u| u.progress).collect();
        assert_eq!(progress, vec![0, 25, 50, 75, 100, 100]);
    }

    #[tokio::test]
    async fn test_progress_sink_may_borrow_locals() {
        let (converter, _) = image_converter();
        let input = InputFile::new("a.webp", b"webpdata".to_vec());
        let seen: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let sink = |update: ProgressUpdate| seen.lock().unwrap().push(update.progress);

        let result = converter
            .convert_many(
                std::slice::from_ref(&input),
                FileFormat::Png,
                &ConversionOptions::default(),
                Some(&sink),
            )
            .await;
        assert!(result.success);

        let progress = seen.into_inner().unwrap();
        assert_eq!(progress.first(), Some(&0));
        assert_eq!(progress.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_engine_ticks_are_clamped() {
        let engine = Arc::new(MockEngine::with_ticks(vec![-0.5, 0.333, 4.0]));
        let converter = Converter::image(engine);
        let (seen, sink) = collect();
        let input = InputFile::new("a.png", b"data".to_vec());

        converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), Some(&sink))
            .await;

        let progress: Vec<u8> = seen.lock().unwrap().iter().map(|u| u.progress).collect();
        assert_eq!(progress, vec![0, 0, 33, 100, 100]);
    }

    #[tokio::test]
    async fn test_encode_failure_cleans_up() {
        let (converter, engine) = image_converter();
        let mut bytes = CORRUPT_MARKER.to_vec();
        bytes.extend_from_slice(b"rest");
        let input = InputFile::new("broken.png", bytes);

        let result = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), None)
            .await;

        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("Invalid data"));
        assert!(engine.resident().is_empty());
    }

    #[tokio::test]
    async fn test_success_cleans_up() {
        let (converter, engine) = image_converter();
        let input = InputFile::new("a.png", b"pngdata".to_vec());
        let result = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), None)
            .await;
        assert!(result.success);
        assert!(engine.resident().is_empty());
    }

    #[tokio::test]
    async fn test_staged_names_are_unique() {
        let (converter, engine) = image_converter();
        let input = InputFile::new("same.png", b"pngdata".to_vec());
        let options = ConversionOptions::default();

        let (a, b) = tokio::join!(
            converter.convert_one(&input, FileFormat::Jpg, &options, None),
            converter.convert_one(&input, FileFormat::Jpg, &options, None),
        );
        assert!(a.success && b.success);

        let names = engine.staged_names();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        assert!(names.iter().all(|n| n.starts_with("input_") && n.ends_with(".png")));
    }

    #[tokio::test]
    async fn test_unsupported_pair_is_a_failed_result() {
        let (converter, engine) = image_converter();
        let input = InputFile::new("clip.mp4", b"video".to_vec());

        let result = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), None)
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Conversion from mp4 to jpg is not supported")
        );
        assert!(engine.commands().is_empty());
    }

    #[tokio::test]
    async fn test_zero_byte_output_has_no_ratio() {
        let engine = Arc::new(MockEngine::with_empty_output());
        let converter = Converter::image(engine);
        let input = InputFile::new("a.png", b"pngdata".to_vec());

        let result = converter
            .convert_one(&input, FileFormat::Jpg, &ConversionOptions::default(), None)
            .await;

        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.converted_size, 0);
        assert_eq!(metadata.compression_ratio, None);
    }

    #[tokio::test]
    async fn test_single_file_batch_matches_convert_one() {
        let (converter, _) = image_converter();
        let input = InputFile::new("one.webp", b"webp-bytes".to_vec());
        let options = ConversionOptions::with_quality(55);

        let single = converter
            .convert_one(&input, FileFormat::Jpg, &options, None)
            .await;
        let many = converter
            .convert_many(std::slice::from_ref(&input), FileFormat::Jpg, &options, None)
            .await;

        assert_eq!(single.data, many.data);
    }

    #[tokio::test]
    async fn test_empty_batch_fails() {
        let (converter, _) = image_converter();
        let result = converter
            .convert_many(&[], FileFormat::Jpg, &ConversionOptions::default(), None)
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No files to convert"));
    }

    #[tokio::test]
    async fn test_file_without_extension_uses_declared_type() {
        let engine = Arc::new(MockEngine::new());
        let converter = Converter::video(engine.clone());
        let input = InputFile::new("upload", b"moov".to_vec()).with_media_type("video/quicktime");

        let result = converter
            .convert_one(&input, FileFormat::Mp4, &ConversionOptions::default(), None)
            .await;

        assert!(result.success);
        assert_eq!(result.data.unwrap().file_name, "upload.mp4");
        assert!(engine.staged_names()[0].ends_with(".mov"));
    }
}
