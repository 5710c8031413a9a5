//! # Progress Reporting Module
//!
//! Questo modulo gestisce il feedback visuale della CLI durante una conversione.
//!
//! ## Responsabilità:
//! - Progress bar `indicatif` su scala 0-100 guidata da `ProgressUpdate`
//! - Messaggio di stato con stage e indice file (`[2/3] processing`)
//! - Spinner per operazioni indeterminate (avvio engine, lettura input)
//! - Riepilogo finale con dimensioni, rapporto di compressione e durata
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 61% [2/3] processing
//! ```

use crate::file_manager::FileManager;
use crate::types::{ConversionMetadata, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar for one conversion call
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Move the bar to the update's percentage and show its stage
    pub fn update(&self, update: &ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress.min(100)));
        let message = status_message(update);
        if !message.is_empty() {
            self.bar.set_message(message);
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `[file/total] stage`, with either part omitted when absent
pub fn status_message(update: &ProgressUpdate) -> String {
    let position = match (update.file, update.total_files) {
        (Some(file), Some(total)) => Some(format!("[{}/{}]", file, total)),
        _ => None,
    };
    match (position, update.stage.as_deref()) {
        (Some(position), Some(stage)) => format!("{} {}", position, stage),
        (Some(position), None) => position,
        (None, Some(stage)) => stage.to_string(),
        (None, None) => String::new(),
    }
}

/// One-line report for a finished conversion
pub fn format_summary(file_name: &str, metadata: &ConversionMetadata) -> String {
    let ratio = metadata
        .compression_ratio
        .map(|r| format!("{:.2}x", r))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "{}: {} -> {} (ratio {}) in {:.2}s",
        file_name,
        FileManager::format_size(metadata.original_size),
        FileManager::format_size(metadata.converted_size),
        ratio,
        metadata.conversion_time.as_secs_f64()
    )
}
