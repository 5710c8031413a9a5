//! # Media Converter Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `format`: Formati noti, famiglie e media type
//! - `catalog`: Modalità di conversione e loro impostazioni
//! - `command`: Compilazione opzioni → argomenti dell'encoder
//! - `engine`: Contratto del codec engine e implementazione ffmpeg
//! - `converter`: Ciclo di vita di una conversione (staging, progress, cleanup)
//! - `batch`: Conversioni multiple sequenziali impacchettate in zip
//! - `archive`: Packager zip
//! - `registry`: Scelta del converter per una coppia di formati
//! - `config`: Configurazione runtime e validazione
//! - `error`: Tipi di errore custom
//! - `progress` / `json_output` / `file_manager`: Supporto alla CLI
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use media_converter::{Config, ConversionOptions, ConverterRegistry, FileFormat, InputFile};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = ConverterRegistry::with_defaults(&Config::default());
//! let file = InputFile::from_path("photo.heic".as_ref()).await?;
//! let result = registry
//!     .convert_files(&[file], FileFormat::Jpg, &ConversionOptions::with_quality(80), None)
//!     .await;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod utils;

pub mod archive;
pub mod batch;
pub mod catalog;
pub mod command;
pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod file_manager;
pub mod format;
pub mod json_output;
pub mod platform;
pub mod progress;
pub mod registry;
pub mod types;

pub use catalog::{ConversionMode, ModeSettings};
pub use config::Config;
pub use converter::Converter;
pub use engine::{CodecEngine, FfmpegEngine};
pub use error::ConvertError;
pub use format::{FileFormat, MediaFamily};
pub use registry::ConverterRegistry;
pub use types::{
    ConversionMetadata, ConversionOptions, ConversionResult, ConvertedData, InputFile,
    ProgressUpdate, ResizeOptions,
};
