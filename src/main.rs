//! # Media Converter - Main Entry Point
//!
//! Questo è il punto di ingresso della CLI `media-convert`.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Caricamento e validazione della configurazione
//! - Discovery dei file, conversione tramite il registry, scrittura del risultato
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, formato di destinazione, qualità, resize)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` ha la precedenza)
//! 3. Carica la configurazione (`--config` o `~/.media-converter/config.json`)
//! 4. Espande le directory nei file convertibili verso il formato richiesto
//! 5. Converte: un file → file convertito, più file → archivio zip
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-convert IMG_0001.heic IMG_0002.heic --to jpg --quality 85
//! media-convert ./clips --to webm --width 1280 --json
//! media-convert --list
//! ```

use anyhow::Result;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use media_converter::catalog::{self, ConversionMode};
use media_converter::file_manager::FileManager;
use media_converter::json_output::JsonMessage;
use media_converter::platform::PlatformCommands;
use media_converter::progress::{self, ProgressManager};
use media_converter::{
    Config, ConversionOptions, ConverterRegistry, FileFormat, InputFile, ProgressUpdate,
    ResizeOptions,
};

#[derive(Parser)]
#[command(name = "media-convert")]
#[command(about = "Convert images and videos between formats")]
struct Args {
    /// Files or directories to convert
    #[arg(required_unless_present = "list")]
    inputs: Vec<PathBuf>,

    /// Target format (jpg, png, webp, avif, heic, mp4, webm, mov, avi, mkv)
    #[arg(short, long, required_unless_present = "list")]
    to: Option<FileFormat>,

    /// Quality (0-100, higher is better)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,

    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Stretch to exactly width x height instead of preserving the aspect ratio
    #[arg(long)]
    stretch: bool,

    /// Extra encoder option forwarded as `-KEY VALUE` (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    set: Vec<(String, String)>,

    /// Output file or directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (default: ~/.media-converter/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output progress and status as JSON lines
    #[arg(long)]
    json: bool,

    /// List conversion modes and supported formats
    #[arg(long)]
    list: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// `RUST_LOG` wins over the `--verbose` default
fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

fn conversion_options(args: &Args) -> ConversionOptions {
    let resize = if args.width.is_some() || args.height.is_some() {
        Some(ResizeOptions {
            width: args.width,
            height: args.height,
            maintain_aspect_ratio: Some(!args.stretch),
        })
    } else {
        None
    };

    ConversionOptions {
        quality: args.quality,
        resize,
        advanced: args.set.iter().cloned().collect::<BTreeMap<_, _>>(),
    }
}

fn print_catalog(registry: &ConverterRegistry) {
    println!("Conversion modes:");
    for mode in ConversionMode::ALL {
        let settings = catalog::describe(mode);
        println!(
            "  {:<14} {:<16} {} (default quality {})",
            mode.id(),
            settings.name,
            settings.description,
            settings.default_quality
        );
    }

    println!();
    println!("Supported conversions:");
    for input in registry.list_input_formats() {
        let outputs: Vec<String> = registry
            .list_output_formats(input)
            .iter()
            .map(|f| f.to_string())
            .collect();
        println!("  {:<5} -> {}", input, outputs.join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for --json output
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    debug!("Running on {}", PlatformCommands::system_info());

    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::from_file(&path).await?,
        None => Config::default(),
    };
    if args.json {
        config.json_output = true;
    }
    if args.output.is_some() {
        config.output_path = args.output.clone();
    }
    config.validate()?;

    let registry = ConverterRegistry::with_defaults(&config);

    if args.list {
        print_catalog(&registry);
        return Ok(());
    }

    let target = args
        .to
        .ok_or_else(|| anyhow::anyhow!("A target format is required (--to)"))?;

    if config.ffmpeg_path.is_none()
        && !PlatformCommands::instance().is_command_available("ffmpeg").await
    {
        warn!("ffmpeg was not found in PATH; conversions will fail to start");
    }

    let paths = FileManager::find_convertible_files(&args.inputs, &registry, target)?;
    if paths.is_empty() {
        return Err(anyhow::anyhow!("No files convertible to {} were found", target));
    }
    info!("Converting {} file(s) to {}", paths.len(), target);

    let json = config.json_output;
    let spinner = (!json).then(|| ProgressManager::spinner("Reading input files"));
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(InputFile::from_path(path).await?);
    }
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let options = config.apply_defaults(conversion_options(&args));
    if json {
        JsonMessage::start(&files, target, &options).emit();
    }

    let bar = (!json).then(ProgressManager::new);
    let on_progress = |update: ProgressUpdate| match &bar {
        Some(bar) => bar.update(&update),
        None => JsonMessage::progress(&update).emit(),
    };

    let result = registry
        .convert_files(&files, target, &options, Some(&on_progress))
        .await;

    match (result.data, result.metadata) {
        (Some(data), Some(metadata)) if result.success => {
            let output_path = if paths.len() == 1 {
                FileManager::output_path_for(&paths[0], target, config.output_path.as_deref())
            } else {
                FileManager::archive_path(config.output_path.as_deref())
            };
            FileManager::write_output(&output_path, &data.bytes).await?;

            match &bar {
                Some(bar) => {
                    bar.finish(&progress::format_summary(&data.file_name, &metadata));
                    info!("Wrote {}", output_path.display());
                }
                None => JsonMessage::complete(output_path, data.media_type, &metadata).emit(),
            }
            Ok(())
        }
        _ => {
            let message = result
                .error
                .unwrap_or_else(|| "Conversion produced no output".to_string());
            match &bar {
                Some(bar) => bar.abandon(&message),
                None => JsonMessage::error(message.clone(), None).emit(),
            }
            Err(anyhow::anyhow!(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_follows_verbose_flag() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert_eq!(log_filter(true).to_string(), "debug");
        assert_eq!(log_filter(false).to_string(), "info");
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("preset=slow").unwrap(),
            ("preset".to_string(), "slow".to_string())
        );
        assert_eq!(parse_key_val(" tune =").unwrap(), ("tune".to_string(), String::new()));
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }
}
