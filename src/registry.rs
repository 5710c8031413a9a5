//! # Converter Registry Module
//!
//! Registro ordinato dei converter, indicizzato per etichetta di famiglia.
//!
//! ## Responsabilità:
//! - `register`: aggiunge un converter o sostituisce quello con la stessa etichetta
//!   (mantenendo la posizione originale)
//! - `dispatch`: primo converter, in ordine di registrazione, che supporta la coppia
//! - `list_input_formats` / `list_output_formats`: unione deduplicata, in ordine
//! - `convert_files`: entry point che rileva i formati, sceglie il converter e
//!   riporta ogni errore come `ConversionResult` fallito
//!
//! Nessuno stato globale: il chiamante costruisce e possiede il registro.

use crate::config::Config;
use crate::converter::Converter;
use crate::engine::FfmpegEngine;
use crate::error::{ConvertError, Result};
use crate::format::{FileFormat, MediaFamily};
use crate::types::{ConversionOptions, ConversionResult, InputFile, ProgressFn};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered set of converters keyed by label
#[derive(Debug, Default)]
pub struct ConverterRegistry {
    entries: Vec<(String, Converter)>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image and video converters, each with its own ffmpeg session
    pub fn with_defaults(config: &Config) -> Self {
        let mut registry = Self::new();
        for family in [MediaFamily::Image, MediaFamily::Video] {
            let engine = Arc::new(FfmpegEngine::new(
                config.ffmpeg_path.clone(),
                config.ffprobe_path.clone(),
            ));
            registry.register(
                family.label(),
                Converter::new(family, engine)
                    .with_archive_level(config.archive_compression_level),
            );
        }
        registry
    }

    /// Add a converter. A converter already registered under `label` is
    /// replaced in place, keeping its dispatch priority.
    pub fn register(&mut self, label: impl Into<String>, converter: Converter) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => {
                debug!("Replacing converter {}", label);
                entry.1 = converter;
            }
            None => {
                debug!("Registering converter {}", label);
                self.entries.push((label, converter));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&Converter> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, converter)| converter)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First converter, in registration order, supporting the pair
    pub fn dispatch(&self, input: FileFormat, output: FileFormat) -> Option<&Converter> {
        self.entries
            .iter()
            .map(|(_, converter)| converter)
            .find(|converter| converter.supports(input, output))
    }

    pub fn is_supported(&self, input: FileFormat, output: FileFormat) -> bool {
        self.dispatch(input, output).is_some()
    }

    /// Every accepted input format, first occurrence order
    pub fn list_input_formats(&self) -> Vec<FileFormat> {
        let mut formats = Vec::new();
        for (_, converter) in &self.entries {
            for format in converter.input_formats() {
                if !formats.contains(format) {
                    formats.push(*format);
                }
            }
        }
        formats
    }

    /// Output formats reachable from `input`
    pub fn list_output_formats(&self, input: FileFormat) -> Vec<FileFormat> {
        let mut formats = Vec::new();
        for (_, converter) in &self.entries {
            if !converter.input_formats().contains(&input) {
                continue;
            }
            for format in converter.output_formats() {
                if !formats.contains(format) {
                    formats.push(*format);
                }
            }
        }
        formats
    }

    /// Convert `files` to `output_format` with the converter that handles them.
    ///
    /// One file yields the converted file; several yield a zip archive. Every
    /// failure, including an unsupported pair, comes back as a failed result.
    pub async fn convert_files(
        &self,
        files: &[InputFile],
        output_format: FileFormat,
        options: &ConversionOptions,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> ConversionResult {
        match self.select(files, output_format) {
            Ok(converter) => {
                converter
                    .convert_many(files, output_format, options, on_progress)
                    .await
            }
            Err(e) => {
                warn!("Cannot convert to {}: {}", output_format, e);
                ConversionResult::failure(e.result_message())
            }
        }
    }

    /// The single converter able to take every file to `output_format`
    fn select(&self, files: &[InputFile], output_format: FileFormat) -> Result<&Converter> {
        let mut selected: Option<&Converter> = None;

        for file in files {
            let input = file
                .format()
                .ok_or_else(|| ConvertError::UnknownFormat(file.name.clone()))?;
            let converter = self
                .dispatch(input, output_format)
                .ok_or(ConvertError::UnsupportedPair {
                    input,
                    output: output_format,
                })?;

            match selected {
                Some(previous) if !std::ptr::eq(previous, converter) => {
                    return Err(ConvertError::Validation(format!(
                        "{} needs the {} converter but the batch started with {}",
                        file.name,
                        converter.family(),
                        previous.family()
                    )));
                }
                _ => selected = Some(converter),
            }
        }

        selected.ok_or(ConvertError::EmptyBatch)
    }
}
