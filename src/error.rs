//! Error types for docmark.

use std::io;
use thiserror::Error;

/// Result type alias for docmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document extraction.
///
/// `UnsupportedFormat`, `UnreadableContainer` and `CapabilityDenied` are fatal:
/// the facade turns them into a failed result with no Markdown. The remaining
/// variants are raised at single-element granularity and are recorded as
/// diagnostics instead of aborting the document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file has no adapter (unknown extension or unrecognized content).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The container could not be opened: corrupt, truncated or password-protected.
    #[error("Unreadable document: {0}")]
    UnreadableContainer(String),

    /// The adapter is available only in a degraded form.
    #[error("{format} extraction degraded: {missing} is unavailable")]
    CapabilityUnavailable {
        /// Format being extracted.
        format: String,
        /// Capability that is missing.
        missing: String,
    },

    /// The capability probe refused extraction of this format entirely.
    #[error("{format} extraction is not available: {reason}")]
    CapabilityDenied {
        /// Format being extracted.
        format: String,
        /// Reason reported by the probe.
        reason: String,
    },

    /// A single image could not be decoded, converted or written.
    #[error("Failed to extract image '{label}': {reason}")]
    AssetExtractionFailed {
        /// Origin label of the image.
        label: String,
        /// What went wrong.
        reason: String,
    },

    /// No relative path exists between the asset and the Markdown directory.
    #[error("Cannot relativize {path} against {base}")]
    RelativizationFailed {
        /// Absolute asset path.
        path: String,
        /// Markdown directory.
        base: String,
    },

    /// Malformed XML inside an OOXML package.
    #[error("XML error: {0}")]
    Xml(String),

    /// Invalid configuration file or value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if this error aborts the whole extraction.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnsupportedFormat(_)
                | Error::UnreadableContainer(_)
                | Error::CapabilityDenied { .. }
        )
    }

    pub(crate) fn asset(label: impl Into<String>, reason: impl ToString) -> Self {
        Error::AssetExtractionFailed {
            label: label.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => {
                Error::UnreadableContainer("document is encrypted".to_string())
            }
            _ => Error::UnreadableContainer(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::UnreadableContainer(err.to_string()),
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(err: calamine::XlsxError) -> Self {
        Error::UnreadableContainer(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(feature = "raster")]
impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::AssetExtractionFailed {
            label: String::new(),
            reason: err.to_string(),
        }
    }
}
