//! Non-fatal notes collected during extraction.

use serde::Serialize;

use super::element::ContainerContext;
use crate::error::Error;

/// Category of a non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A degraded adapter path was taken.
    CapabilityUnavailable,
    /// One image could not be decoded or written and was skipped.
    AssetExtractionFailed,
    /// A synthetic relative path was used for an asset link.
    RelativizationFailed,
    /// Image extraction was switched off by configuration.
    ImagesDisabled,
    /// A page, slide or sheet (or its images) could not be read and is missing.
    ContentSkipped,
}

/// A non-fatal note attached to an extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerContext>,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            container: None,
        }
    }

    /// Attach the page, slide or sheet the problem occurred in.
    pub fn in_container(mut self, container: &ContainerContext) -> Self {
        if *container != ContainerContext::Document {
            self.container = Some(container.clone());
        }
        self
    }

    /// Record a skipped image.
    pub fn asset_failed(err: &Error) -> Self {
        Self::new(DiagnosticKind::AssetExtractionFailed, err.to_string())
    }

    /// Record content of a container that was left out.
    pub fn content_skipped(container: &ContainerContext, err: &Error) -> Self {
        Self::new(DiagnosticKind::ContentSkipped, err.to_string()).in_container(container)
    }

    /// Whether this note means the user lost content.
    pub fn is_degradation(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::CapabilityUnavailable | DiagnosticKind::ContentSkipped
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.container.as_ref().and_then(|c| c.label()) {
            Some(label) => write!(f, "{} ({})", self.message, label),
            None => f.write_str(&self.message),
        }
    }
}
