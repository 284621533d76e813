//! Document format detection and validation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Local file header signature of a zip archive (every OOXML package).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Bytes from the start of a file that are inspected by [`sniff_bytes`].
const HEADER_LEN: usize = 1024;

/// The closed set of container formats that have an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format
    Pdf,
    /// Office Open XML word-processing document
    Docx,
    /// Office Open XML presentation
    Pptx,
    /// Office Open XML spreadsheet
    Xlsx,
}

impl DocumentFormat {
    /// All supported formats.
    pub const ALL: [DocumentFormat; 4] = [
        DocumentFormat::Pdf,
        DocumentFormat::Docx,
        DocumentFormat::Pptx,
        DocumentFormat::Xlsx,
    ];

    /// Resolve the format from a file extension (case-insensitive, with or without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "pptx" => Some(DocumentFormat::Pptx),
            "xlsx" => Some(DocumentFormat::Xlsx),
            _ => None,
        }
    }

    /// Resolve the format of a document path from its extension.
    ///
    /// # Example
    /// ```
    /// use docmark::DocumentFormat;
    ///
    /// assert_eq!(DocumentFormat::from_path("Report.PDF").unwrap(), DocumentFormat::Pdf);
    /// assert!(DocumentFormat::from_path("notes.odt").is_err());
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))
    }

    /// Canonical lowercase extension.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Xlsx => "xlsx",
        }
    }

    /// Whether the format is an OOXML zip package.
    pub fn is_ooxml(&self) -> bool {
        !matches!(self, DocumentFormat::Pdf)
    }

    /// Check that `data` starts like a container of this format.
    ///
    /// A mismatch means the file carries the right extension but is not a
    /// readable container, so it is reported as [`Error::UnreadableContainer`].
    pub fn validate_header(&self, data: &[u8]) -> Result<()> {
        let ok = match self {
            // Some producers emit garbage before the header; readers accept it within 1 KiB.
            DocumentFormat::Pdf => data
                .windows(PDF_MAGIC.len())
                .take(HEADER_LEN)
                .any(|w| w == PDF_MAGIC),
            _ => data.starts_with(ZIP_MAGIC),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::UnreadableContainer(format!(
                "not a valid {} container",
                self
            )))
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Pptx => "PPTX",
            DocumentFormat::Xlsx => "XLSX",
        };
        f.write_str(name)
    }
}

/// Guess the container family from leading bytes.
///
/// Returns `Some(Pdf)` for PDF data. OOXML packages cannot be told apart
/// from their first bytes, so zip data yields `None` here and callers fall
/// back to the file extension.
pub fn sniff_bytes(data: &[u8]) -> Option<DocumentFormat> {
    DocumentFormat::Pdf
        .validate_header(data)
        .ok()
        .map(|_| DocumentFormat::Pdf)
}

/// Check whether the file at `path` looks like a supported container.
pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    let Ok(format) = DocumentFormat::from_path(path) else {
        return false;
    };
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut header = Vec::with_capacity(HEADER_LEN);
    if file
        .by_ref()
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .is_err()
    {
        return false;
    }
    format.validate_header(&header).is_ok()
}
