//! # Archive Module
//!
//! Impacchettamento dei risultati di un batch in un singolo archivio zip.
//!
//! ## Responsabilità:
//! - `ArchivePackager`: contratto per il packager (entry nominate + finalize)
//! - `ZipPackager`: implementazione deflate con livello configurabile (0-9)
//! - `EntryNames`: nomi univoci per le entry (`photo.jpg`, `photo (2).jpg`, ...)

use crate::error::{ConvertError, Result};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds an archive from named entries
pub trait ArchivePackager {
    fn add_entry(&mut self, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Produce the archive bytes at the given deflate level
    fn finalize(self, compression_level: u8) -> Result<Vec<u8>>;
}

/// In-memory zip packager. Entries keep insertion order.
#[derive(Debug, Default)]
pub struct ZipPackager {
    entries: Vec<(String, Vec<u8>)>,
}

impl ZipPackager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArchivePackager for ZipPackager {
    fn add_entry(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        if name.is_empty() {
            return Err(ConvertError::Archive("entry name cannot be empty".into()));
        }
        self.entries.push((name.to_string(), bytes));
        Ok(())
    }

    fn finalize(self, compression_level: u8) -> Result<Vec<u8>> {
        // level 0 means store
        let options = match compression_level.min(9) {
            0 => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
            level => SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level))),
        };

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in self.entries {
            writer.start_file(name, options)?;
            writer.write_all(&bytes)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Hands out entry names, suffixing repeats as `stem (n).ext`
#[derive(Debug, Default)]
pub struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    pub fn claim(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };

        let mut n = 2;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
