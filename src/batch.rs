//! # Batch Module
//!
//! Orchestrazione di un batch di file verso un unico formato di output.
//!
//! ## Regole:
//! - Conversione sequenziale, un file alla volta, nell'ordine dato
//! - Tutto-o-niente: il primo fallimento interrompe il batch
//!   (`Failed to convert file <name>`) e nessun archivio viene prodotto
//! - Progresso aggregato: `round((completati + frazione_corrente) / totale * 100)`,
//!   mai decrescente, con indice file (1-based) e totale
//! - Stage `creating archive` prima dell'impacchettamento, poi `100` finale
//!
//! Il risultato è un archivio zip (`converted_files.zip`) con un'entry per file,
//! nominata come l'input con l'estensione del formato di output.

use crate::archive::{ArchivePackager, EntryNames};
use crate::converter::Converter;
use crate::error::{ConvertError, Result};
use crate::format::FileFormat;
use crate::types::{
    ConversionMetadata, ConversionOptions, ConversionResult, ConvertedData, InputFile,
    ProgressFn, ProgressUpdate,
};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Download name of a batch archive
pub const ARCHIVE_NAME: &str = "converted_files.zip";
pub const ARCHIVE_MEDIA_TYPE: &str = "application/zip";

pub const STAGE_PROCESSING: &str = "processing";
pub const STAGE_ARCHIVING: &str = "creating archive";

/// Name of a converted file: the input's extension is replaced, or the
/// target extension appended when there is none.
pub fn converted_name(original: &str, format: FileFormat) -> String {
    let stem = match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem,
        _ => original,
    };
    format!("{}.{}", stem, format.extension())
}

/// Folds per-file ticks into one non-decreasing batch percentage
pub struct BatchProgress<'a> {
    sink: Option<&'a ProgressFn<'a>>,
    total_files: usize,
    last: AtomicU8,
}

impl<'a> BatchProgress<'a> {
    pub fn new(sink: Option<&'a ProgressFn<'a>>, total_files: usize) -> Self {
        Self {
            sink,
            total_files,
            last: AtomicU8::new(0),
        }
    }

    /// Overall percentage with `completed` files done and the current one at `file_progress`
    pub fn aggregate(completed: usize, file_progress: u8, total_files: usize) -> u8 {
        if total_files == 0 {
            return 100;
        }
        let fraction = (completed as f64 + f64::from(file_progress.min(100)) / 100.0)
            / total_files as f64;
        (fraction * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn current(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    fn emit(&self, progress: u8, stage: &str, file: Option<usize>) {
        let previous = self.last.fetch_max(progress, Ordering::SeqCst);
        let progress = previous.max(progress);
        if let Some(sink) = self.sink {
            sink(ProgressUpdate {
                progress,
                stage: Some(stage.to_string()),
                file,
                total_files: Some(self.total_files),
            });
        }
    }

    /// Tick from the file at zero-based `index`
    pub fn file_tick(&self, index: usize, update: &ProgressUpdate) {
        let stage = update.stage.as_deref().unwrap_or(STAGE_PROCESSING);
        self.emit(
            Self::aggregate(index, update.progress, self.total_files),
            stage,
            Some(index + 1),
        );
    }

    pub fn archiving(&self) {
        self.emit(self.current(), STAGE_ARCHIVING, None);
    }

    pub fn finish(&self) {
        self.last.store(100, Ordering::SeqCst);
        if let Some(sink) = self.sink {
            sink(ProgressUpdate {
                total_files: Some(self.total_files),
                ..ProgressUpdate::new(100)
            });
        }
    }
}

/// Convert `files` one at a time with `converter` and package them with `packager`.
///
/// Errors are folded into the returned result.
pub async fn run<P: ArchivePackager>(
    converter: &Converter,
    files: &[InputFile],
    output_format: FileFormat,
    options: &ConversionOptions,
    on_progress: Option<&ProgressFn<'_>>,
    packager: P,
    compression_level: u8,
) -> ConversionResult {
    match convert_into_archive(
        converter,
        files,
        output_format,
        options,
        on_progress,
        packager,
        compression_level,
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            warn!("Batch conversion aborted: {}", e);
            ConversionResult::failure(e.result_message())
        }
    }
}

async fn convert_into_archive<P: ArchivePackager>(
    converter: &Converter,
    files: &[InputFile],
    output_format: FileFormat,
    options: &ConversionOptions,
    on_progress: Option<&ProgressFn<'_>>,
    mut packager: P,
    compression_level: u8,
) -> Result<ConversionResult> {
    if files.is_empty() {
        return Err(ConvertError::EmptyBatch);
    }

    let start = Instant::now();
    let progress = BatchProgress::new(on_progress, files.len());
    let mut names = EntryNames::default();

    info!("Converting {} files to {}", files.len(), output_format);

    for (index, file) in files.iter().enumerate() {
        debug!("Batch file {}/{}: {}", index + 1, files.len(), file.name);

        let forward: &ProgressFn<'_> = &|update: ProgressUpdate| progress.file_tick(index, &update);
        let result = converter
            .convert_one(file, output_format, options, Some(forward))
            .await;

        let data = match result.data {
            Some(data) if result.success => data,
            _ => {
                debug!(
                    "{} failed: {}",
                    file.name,
                    result.error.as_deref().unwrap_or("no output")
                );
                return Err(ConvertError::BatchAbort {
                    file: file.name.clone(),
                });
            }
        };

        let entry = names.claim(&data.file_name);
        packager.add_entry(&entry, data.bytes)?;
    }

    progress.archiving();
    let archive = packager.finalize(compression_level)?;

    let original_size: u64 = files.iter().map(InputFile::size).sum();
    let metadata = ConversionMetadata::new(original_size, archive.len() as u64, start.elapsed());
    info!(
        "Batch archive ready: {} files, {} -> {} bytes",
        files.len(),
        original_size,
        archive.len()
    );

    progress.finish();

    Ok(ConversionResult::success(
        ConvertedData {
            bytes: archive,
            media_type: ARCHIVE_MEDIA_TYPE,
            file_name: ARCHIVE_NAME.to_string(),
        },
        metadata,
    ))
}
