//! Capability probing and the fallback policy.
//!
//! Before an adapter runs, the facade asks a [`CapabilityProbe`] whether the
//! format can be extracted fully, only partially, or not at all. A degraded
//! answer makes the adapter run text-only; the caller learns what was lost
//! through a diagnostic and the result status instead of a silent gap.

use serde::Serialize;

use crate::detect::DocumentFormat;

/// What the probe reports for one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Capability {
    /// Text, tables and images.
    Full,
    /// Extraction runs without images.
    Degraded {
        /// The capability that is missing
        missing: String,
        /// What the output will lack
        lost: String,
    },
    /// Extraction cannot run.
    Denied {
        reason: String,
    },
}

impl Capability {
    pub fn is_full(&self) -> bool {
        matches!(self, Capability::Full)
    }

    /// Whether images can be extracted.
    pub fn allows_images(&self) -> bool {
        self.is_full()
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Full => write!(f, "full"),
            Capability::Degraded { missing, lost } => {
                write!(f, "degraded ({} unavailable, {} lost)", missing, lost)
            }
            Capability::Denied { reason } => write!(f, "denied ({})", reason),
        }
    }
}

/// Decides, per format, what the current environment can extract.
pub trait CapabilityProbe: Send + Sync {
    fn probe(&self, format: DocumentFormat) -> Capability;
}

/// Probe answering from the crate's compile-time features.
///
/// PDF images need pixel conversion (CMYK, indexed and raw samples to PNG),
/// which lives behind the `raster` feature. Office formats store their media
/// as ready-made files, so they are always fully supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProbe;

impl CapabilityProbe for BuiltinProbe {
    fn probe(&self, format: DocumentFormat) -> Capability {
        match format {
            DocumentFormat::Pdf if !cfg!(feature = "raster") => Capability::Degraded {
                missing: "raster image decoding".to_string(),
                lost: "embedded images".to_string(),
            },
            _ => Capability::Full,
        }
    }
}

/// Probe that returns the same answer for every format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedProbe(pub Capability);

impl CapabilityProbe for FixedProbe {
    fn probe(&self, _format: DocumentFormat) -> Capability {
        self.0.clone()
    }
}

impl<F> CapabilityProbe for F
where
    F: Fn(DocumentFormat) -> Capability + Send + Sync,
{
    fn probe(&self, format: DocumentFormat) -> Capability {
        self(format)
    }
}
