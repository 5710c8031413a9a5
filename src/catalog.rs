//! # Format Catalog Module
//!
//! Questo modulo elenca le modalità di conversione supportate e le loro proprietà fisse.
//!
//! ## Responsabilità:
//! - Definisce `ConversionMode`: coppie (input, output) con nome e impostazioni di default
//! - `describe()`: estensioni accettate, media type di output, qualità di default
//! - `resolve_mode()`: lookup inverso da coppia di formati a modalità
//! - `default_quality_for()`: qualità di default per formato di output, usata dal compiler
//!
//! ## Modalità:
//! - **Immagini**: heic↔jpg, png↔jpg, webp↔jpg, avif↔jpg
//! - **Video**: mp4↔webm, mov↔mp4, avi↔mp4, mkv↔mp4
//!
//! Una coppia senza modalità (`resolve_mode` → `None`) non è un errore: il chiamante
//! la tratta come "coppia non supportata".

use crate::error::ConvertError;
use crate::format::FileFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named conversion pair with fixed default settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMode {
    HeicToJpg,
    JpgToHeic,
    PngToJpg,
    JpgToPng,
    WebpToJpg,
    JpgToWebp,
    AvifToJpg,
    JpgToAvif,

    Mp4ToWebm,
    WebmToMp4,
    MovToMp4,
    Mp4ToMov,
    AviToMp4,
    Mp4ToAvi,
    MkvToMp4,
    Mp4ToMkv,
}

/// Fixed properties of a conversion mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeSettings {
    pub name: &'static str,
    pub description: &'static str,
    pub input_format: FileFormat,
    pub output_format: FileFormat,
    pub accepted_extensions: &'static [&'static str],
    pub output_media_type: &'static str,
    pub default_quality: u8,
}

const JPG_EXTENSIONS: &[&str] = &[".jpg", ".jpeg"];
const HEIC_EXTENSIONS: &[&str] = &[".heic"];
const PNG_EXTENSIONS: &[&str] = &[".png"];
const WEBP_EXTENSIONS: &[&str] = &[".webp"];
const AVIF_EXTENSIONS: &[&str] = &[".avif"];
const MP4_EXTENSIONS: &[&str] = &[".mp4"];
const WEBM_EXTENSIONS: &[&str] = &[".webm"];
const MOV_EXTENSIONS: &[&str] = &[".mov"];
const AVI_EXTENSIONS: &[&str] = &[".avi"];
const MKV_EXTENSIONS: &[&str] = &[".mkv"];

impl ConversionMode {
    pub const ALL: [ConversionMode; 16] = [
        Self::HeicToJpg,
        Self::JpgToHeic,
        Self::PngToJpg,
        Self::JpgToPng,
        Self::WebpToJpg,
        Self::JpgToWebp,
        Self::AvifToJpg,
        Self::JpgToAvif,
        Self::Mp4ToWebm,
        Self::WebmToMp4,
        Self::MovToMp4,
        Self::Mp4ToMov,
        Self::AviToMp4,
        Self::Mp4ToAvi,
        Self::MkvToMp4,
        Self::Mp4ToMkv,
    ];

    /// Kebab-case identifier, e.g. `heic-to-jpg`
    pub fn id(&self) -> &'static str {
        match self {
            Self::HeicToJpg => "heic-to-jpg",
            Self::JpgToHeic => "jpg-to-heic",
            Self::PngToJpg => "png-to-jpg",
            Self::JpgToPng => "jpg-to-png",
            Self::WebpToJpg => "webp-to-jpg",
            Self::JpgToWebp => "jpg-to-webp",
            Self::AvifToJpg => "avif-to-jpg",
            Self::JpgToAvif => "jpg-to-avif",
            Self::Mp4ToWebm => "mp4-to-webm",
            Self::WebmToMp4 => "webm-to-mp4",
            Self::MovToMp4 => "mov-to-mp4",
            Self::Mp4ToMov => "mp4-to-mov",
            Self::AviToMp4 => "avi-to-mp4",
            Self::Mp4ToAvi => "mp4-to-avi",
            Self::MkvToMp4 => "mkv-to-mp4",
            Self::Mp4ToMkv => "mp4-to-mkv",
        }
    }

    pub fn pair(&self) -> (FileFormat, FileFormat) {
        let settings = describe(*self);
        (settings.input_format, settings.output_format)
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ConversionMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.id() == wanted)
            .ok_or_else(|| ConvertError::Validation(format!("unknown conversion mode: {}", s)))
    }
}

/// Fixed settings for a mode
pub fn describe(mode: ConversionMode) -> ModeSettings {
    use ConversionMode::*;
    use FileFormat as F;

    let (name, description, input_format, output_format, accepted_extensions, default_quality) =
        match mode {
            HeicToJpg => (
                "HEIC to JPG",
                "Convert HEIC images to widely-compatible JPG format",
                F::Heic,
                F::Jpg,
                HEIC_EXTENSIONS,
                90,
            ),
            JpgToHeic => (
                "JPG to HEIC",
                "Convert JPG images to compact HEIC format",
                F::Jpg,
                F::Heic,
                JPG_EXTENSIONS,
                80,
            ),
            PngToJpg => (
                "PNG to JPG",
                "Convert PNG images to JPG format",
                F::Png,
                F::Jpg,
                PNG_EXTENSIONS,
                90,
            ),
            JpgToPng => (
                "JPG to PNG",
                "Convert JPG images to lossless PNG format",
                F::Jpg,
                F::Png,
                JPG_EXTENSIONS,
                100,
            ),
            WebpToJpg => (
                "WebP to JPG",
                "Convert WebP images to JPG format",
                F::Webp,
                F::Jpg,
                WEBP_EXTENSIONS,
                90,
            ),
            JpgToWebp => (
                "JPG to WebP",
                "Convert JPG images to efficient WebP format",
                F::Jpg,
                F::Webp,
                JPG_EXTENSIONS,
                80,
            ),
            AvifToJpg => (
                "AVIF to JPG",
                "Convert AVIF images to JPG format",
                F::Avif,
                F::Jpg,
                AVIF_EXTENSIONS,
                90,
            ),
            JpgToAvif => (
                "JPG to AVIF",
                "Convert JPG images to efficient AVIF format",
                F::Jpg,
                F::Avif,
                JPG_EXTENSIONS,
                70,
            ),
            Mp4ToWebm => (
                "MP4 to WebM",
                "Convert MP4 videos to WebM format for web",
                F::Mp4,
                F::Webm,
                MP4_EXTENSIONS,
                80,
            ),
            WebmToMp4 => (
                "WebM to MP4",
                "Convert WebM videos to widely-compatible MP4 format",
                F::Webm,
                F::Mp4,
                WEBM_EXTENSIONS,
                80,
            ),
            MovToMp4 => (
                "MOV to MP4",
                "Convert QuickTime MOV videos to MP4 format",
                F::Mov,
                F::Mp4,
                MOV_EXTENSIONS,
                80,
            ),
            Mp4ToMov => (
                "MP4 to MOV",
                "Convert MP4 videos to QuickTime MOV format",
                F::Mp4,
                F::Mov,
                MP4_EXTENSIONS,
                80,
            ),
            AviToMp4 => (
                "AVI to MP4",
                "Convert AVI videos to MP4 format",
                F::Avi,
                F::Mp4,
                AVI_EXTENSIONS,
                80,
            ),
            Mp4ToAvi => (
                "MP4 to AVI",
                "Convert MP4 videos to AVI format",
                F::Mp4,
                F::Avi,
                MP4_EXTENSIONS,
                80,
            ),
            MkvToMp4 => (
                "MKV to MP4",
                "Convert MKV videos to MP4 format",
                F::Mkv,
                F::Mp4,
                MKV_EXTENSIONS,
                80,
            ),
            Mp4ToMkv => (
                "MP4 to MKV",
                "Convert MP4 videos to MKV format",
                F::Mp4,
                F::Mkv,
                MP4_EXTENSIONS,
                80,
            ),
        };

    ModeSettings {
        name,
        description,
        input_format,
        output_format,
        accepted_extensions,
        output_media_type: output_format.media_type(),
        default_quality,
    }
}

/// Reverse lookup: the mode for an (input, output) pair, if the catalog has one.
///
/// `jpeg` is treated as `jpg` on either side.
pub fn resolve_mode(input: FileFormat, output: FileFormat) -> Option<ConversionMode> {
    let input = canonical(input);
    let output = canonical(output);
    ConversionMode::ALL.into_iter().find(|mode| {
        let settings = describe(*mode);
        settings.input_format == input && settings.output_format == output
    })
}

/// Default quality for an output format: the default of the first catalog
/// mode producing it. Formats no mode produces have no default.
pub fn default_quality_for(output: FileFormat) -> Option<u8> {
    let output = canonical(output);
    ConversionMode::ALL
        .into_iter()
        .map(describe)
        .find(|settings| settings.output_format == output)
        .map(|settings| settings.default_quality)
}

fn canonical(format: FileFormat) -> FileFormat {
    match format {
        FileFormat::Jpeg => FileFormat::Jpg,
        other => other,
    }
}
