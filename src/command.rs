//! # Command Compiler Module
//!
//! Traduce (formato di output, `ConversionOptions`) nella lista ordinata di argomenti
//! per l'encoder. È una funzione pura: stessi input, stessa lista, sempre.
//!
//! ## Struttura del comando:
//! ```text
//! -i <input> [quality] [-vf scale=...] [flag fissi del formato] [advanced] <output>
//! ```
//!
//! ## Mapping qualità (0-100 → scala nativa):
//!
//! | Formato        | Flag                 | Range   | Orientamento |
//! |----------------|----------------------|---------|--------------|
//! | jpg / jpeg     | `-q:v`               | 2-31    | invertito    |
//! | png            | `-compression_level` | 0-9     | diretto      |
//! | webp           | `-quality`           | 0-100   | diretto      |
//! | avif           | `-crf`               | 0-63    | invertito    |
//! | heic           | `-crf`               | 0-51    | invertito    |
//! | mp4 / mov / mkv| `-crf` (libx264)     | 17-35   | invertito    |
//! | webm           | `-crf` (libvpx-vp9)  | 20-45   | invertito    |
//! | avi            | `-q:v` (mjpeg)       | 2-31    | invertito    |
//!
//! Invertito: `nativo = round(max - q/100 * (max - min))`.
//! Diretto: `nativo = round(min + q/100 * (max - min))`.
//!
//! Senza qualità esplicita le immagini usano la qualità di default del catalogo,
//! i video una costante "media" per codec (CRF 23, CRF 30, q:v 10).

use crate::args;
use crate::catalog;
use crate::format::{FileFormat, MediaFamily};
use crate::types::{ConversionOptions, ResizeOptions};

/// Default CRF for the H.264 family when no quality is requested
pub const H264_DEFAULT_CRF: u32 = 23;
/// Default CRF for VP9 when no quality is requested
pub const VP9_DEFAULT_CRF: u32 = 30;
/// Default MJPEG quantizer for AVI when no quality is requested
pub const AVI_DEFAULT_QSCALE: u32 = 10;

const AUDIO_BITRATE: &str = "128k";

/// A codec's native single-scalar quality control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeScale {
    pub flag: &'static str,
    pub min: u32,
    pub max: u32,
    /// Low native value means high quality
    pub inverted: bool,
}

impl NativeScale {
    const fn inverted(flag: &'static str, min: u32, max: u32) -> Self {
        Self {
            flag,
            min,
            max,
            inverted: true,
        }
    }

    const fn direct(flag: &'static str, min: u32, max: u32) -> Self {
        Self {
            flag,
            min,
            max,
            inverted: false,
        }
    }

    /// Map a 0-100 quality onto this scale. Quality above 100 is clamped.
    pub fn map(&self, quality: u8) -> u32 {
        let fraction = f64::from(quality.min(100)) / 100.0;
        let span = f64::from(self.max - self.min);
        let native = if self.inverted {
            f64::from(self.max) - fraction * span
        } else {
            f64::from(self.min) + fraction * span
        };
        native.round() as u32
    }
}

/// Native quality scale for an output format; `None` for document formats
pub fn native_scale(format: FileFormat) -> Option<NativeScale> {
    use FileFormat::*;
    match format {
        Jpg | Jpeg => Some(NativeScale::inverted("-q:v", 2, 31)),
        Png => Some(NativeScale::direct("-compression_level", 0, 9)),
        Webp => Some(NativeScale::direct("-quality", 0, 100)),
        Avif => Some(NativeScale::inverted("-crf", 0, 63)),
        Heic => Some(NativeScale::inverted("-crf", 0, 51)),
        Mp4 | Mov | Mkv => Some(NativeScale::inverted("-crf", 17, 35)),
        Webm => Some(NativeScale::inverted("-crf", 20, 45)),
        Avi => Some(NativeScale::inverted("-q:v", 2, 31)),
        Pdf | Doc | Docx | Psd => None,
    }
}

/// The (flag, native value) pair for an output format and optional quality
pub fn quality_directive(format: FileFormat, quality: Option<u8>) -> Option<(&'static str, u32)> {
    let scale = native_scale(format)?;
    let native = match (quality, format.family()) {
        (Some(quality), _) => scale.map(quality),
        (None, MediaFamily::Video) => video_default(format)?,
        (None, _) => scale.map(catalog::default_quality_for(format)?),
    };
    Some((scale.flag, native))
}

fn video_default(format: FileFormat) -> Option<u32> {
    match format {
        FileFormat::Mp4 | FileFormat::Mov | FileFormat::Mkv => Some(H264_DEFAULT_CRF),
        FileFormat::Webm => Some(VP9_DEFAULT_CRF),
        FileFormat::Avi => Some(AVI_DEFAULT_QSCALE),
        _ => None,
    }
}

/// Scale filter for a resize request.
///
/// Video uses `-2` for the automatic side and keeps fitted dimensions even,
/// since the H.264/VP9 encoders reject odd frame sizes.
pub fn resize_directive(family: MediaFamily, resize: &ResizeOptions) -> Option<String> {
    let width = resize.width.filter(|w| *w > 0);
    let height = resize.height.filter(|h| *h > 0);
    let auto = if family == MediaFamily::Video { -2 } else { -1 };

    let filter = match (width, height) {
        (Some(w), Some(h)) if resize.maintain_aspect_ratio == Some(false) => {
            format!("scale={}:{}", w, h)
        }
        (Some(w), Some(h)) if family == MediaFamily::Video => format!(
            "scale={}:{}:force_original_aspect_ratio=decrease:force_divisible_by=2",
            w, h
        ),
        (Some(w), Some(h)) => format!("scale={}:{}:force_original_aspect_ratio=decrease", w, h),
        (Some(w), None) => format!("scale={}:{}", w, auto),
        (None, Some(h)) => format!("scale={}:{}", auto, h),
        (None, None) => return None,
    };
    Some(filter)
}

/// Pixel format, codec and container flags. Fixed per output format.
pub fn fixed_flags(format: FileFormat) -> Vec<String> {
    use FileFormat::*;
    match format {
        Jpg | Jpeg => args!["-frames:v", 1, "-pix_fmt", "yuvj420p"],
        Png => args!["-frames:v", 1, "-pix_fmt", "rgba"],
        Webp => args!["-frames:v", 1, "-c:v", "libwebp", "-preset", "photo", "-lossless", 0],
        Avif => args!["-frames:v", 1, "-pix_fmt", "yuv420p", "-c:v", "libaom-av1"],
        Heic => args![
            "-frames:v", 1, "-pix_fmt", "yuv420p", "-c:v", "libx265", "-tag:v", "hvc1"
        ],
        Mp4 | Mov => args![
            "-c:v", "libx264", "-pix_fmt", "yuv420p",
            "-c:a", "aac", "-b:a", AUDIO_BITRATE,
            "-movflags", "+faststart"
        ],
        Mkv => args!["-c:v", "libx264", "-c:a", "aac", "-b:a", AUDIO_BITRATE],
        Webm => args![
            "-c:v", "libvpx-vp9", "-b:v", 0,
            "-deadline", "good", "-cpu-used", 2,
            "-c:a", "libopus", "-b:a", AUDIO_BITRATE
        ],
        Avi => args!["-c:v", "mjpeg", "-c:a", "aac", "-b:a", AUDIO_BITRATE],
        Pdf | Doc | Docx | Psd => Vec::new(),
    }
}

/// Compile the full encoder argument list.
///
/// Always starts with `-i <input_name>` and ends with `<output_name>`.
pub fn compile(
    input_name: &str,
    output_name: &str,
    output_format: FileFormat,
    options: &ConversionOptions,
) -> Vec<String> {
    let mut command = args!["-i", input_name];

    if let Some((flag, value)) = quality_directive(output_format, options.quality) {
        command.extend(args![flag, value]);
    }

    if let Some(ref resize) = options.resize {
        if let Some(filter) = resize_directive(output_format.family(), resize) {
            command.extend(args!["-vf", filter]);
        }
    }

    command.extend(fixed_flags(output_format));

    for (key, value) in &options.advanced {
        let flag = if key.starts_with('-') {
            key.clone()
        } else {
            format!("-{}", key)
        };
        command.push(flag);
        if !value.is_empty() {
            command.push(value.clone());
        }
    }

    command.push(output_name.to_string());
    command
}
