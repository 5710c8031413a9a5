//! # File Format Module
//!
//! Questo modulo definisce l'insieme chiuso dei formati riconosciuti dal convertitore.
//!
//! ## Responsabilità:
//! - Enumera tutti i formati (`FileFormat`) partizionati per famiglia (`MediaFamily`)
//! - Parsing case-insensitive di estensioni e nomi file
//! - Tabella fissa dei media type di output (fallback `application/octet-stream`)
//!
//! ## Famiglie:
//! - **Image**: jpg, jpeg, png, heic, avif, webp
//! - **Video**: mp4, webm, mov, avi, mkv
//! - **Document**: pdf, doc, docx, psd (nessun convertitore registrato)
//!
//! ## Esempio:
//! ```rust
//! use media_converter::format::{FileFormat, MediaFamily};
//!
//! let format: FileFormat = "HEIC".parse().unwrap();
//! assert_eq!(format.family(), MediaFamily::Image);
//! assert_eq!(format.media_type(), "image/heic");
//! ```

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Media family a format belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFamily {
    Image,
    Video,
    Document,
}

impl MediaFamily {
    /// Label used when registering the family's converter
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for MediaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every format the converter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    // Image
    Jpg,
    Jpeg,
    Png,
    Heic,
    Avif,
    Webp,
    // Video
    Mp4,
    Webm,
    Mov,
    Avi,
    Mkv,
    // Document
    Pdf,
    Doc,
    Docx,
    Psd,
}

impl FileFormat {
    pub const ALL: [FileFormat; 15] = [
        Self::Jpg,
        Self::Jpeg,
        Self::Png,
        Self::Heic,
        Self::Avif,
        Self::Webp,
        Self::Mp4,
        Self::Webm,
        Self::Mov,
        Self::Avi,
        Self::Mkv,
        Self::Pdf,
        Self::Doc,
        Self::Docx,
        Self::Psd,
    ];

    /// Canonical file extension (without the leading dot)
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Heic => "heic",
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mov => "mov",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Psd => "psd",
        }
    }

    pub fn family(&self) -> MediaFamily {
        match self {
            Self::Jpg | Self::Jpeg | Self::Png | Self::Heic | Self::Avif | Self::Webp => {
                MediaFamily::Image
            }
            Self::Mp4 | Self::Webm | Self::Mov | Self::Avi | Self::Mkv => MediaFamily::Video,
            Self::Pdf | Self::Doc | Self::Docx | Self::Psd => MediaFamily::Document,
        }
    }

    /// Media type used to tag converted output
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Heic => "image/heic",
            Self::Avif => "image/avif",
            Self::Webp => "image/webp",
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Mov => "video/quicktime",
            Self::Avi => "video/x-msvideo",
            Self::Mkv => "video/x-matroska",
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Psd => "image/vnd.adobe.photoshop",
        }
    }

    /// Parse a bare extension, with or without the leading dot
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Detect the format from a file name's extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Reverse lookup from a declared media type. `image/jpeg` resolves to `jpg`.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let media_type = media_type.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.media_type() == media_type)
    }
}

/// Media type for an optional format, falling back to a generic octet stream
pub fn media_type_for(format: Option<FileFormat>) -> &'static str {
    format
        .map(|f| f.media_type())
        .unwrap_or("application/octet-stream")
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| ConvertError::UnknownFormat(s.to_string()))
    }
}
