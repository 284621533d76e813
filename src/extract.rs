//! Extraction facade: one call from a document path to Markdown plus assets.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::assets::AssetStore;
use crate::capability::{BuiltinProbe, Capability, CapabilityProbe};
use crate::detect::DocumentFormat;
use crate::error::{Error, Result};
use crate::model::{ContentElement, Diagnostic, DiagnosticKind, StoredAsset};
use crate::parser::{self, ParseOptions};
use crate::render::{ExtractionStats, MarkdownMode, MarkdownRenderer, RenderOptions};

/// Overall outcome of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Everything the format offers was extracted.
    Complete,
    /// Extraction ran on a degraded path; diagnostics say what was lost.
    Degraded,
    /// Nothing was extracted.
    Failed,
}

/// Options for a whole extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Where images are written. Defaults to `<markdown_dir>/images/<stem>`.
    pub output_dir: Option<PathBuf>,

    /// Where the Markdown file will live. Defaults to the document's directory.
    pub markdown_dir: Option<PathBuf>,

    /// Adapter options
    pub parse: ParseOptions,

    /// Serializer options
    pub render: RenderOptions,

    /// Extract images at all
    pub images_enabled: bool,

    /// Reuse one file for identical image bytes
    pub deduplicate_images: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            markdown_dir: None,
            parse: ParseOptions::default(),
            render: RenderOptions::default(),
            images_enabled: true,
            deduplicate_images: false,
        }
    }
}

/// Converts documents to Markdown, writing their images alongside.
///
/// # Example
/// ```no_run
/// use docmark::{Extractor, MarkdownMode};
///
/// let result = Extractor::new()
///     .with_markdown_dir("notes")
///     .with_min_image_size(32)
///     .with_mode(MarkdownMode::FullContent)
///     .extract("report.pdf");
///
/// if result.success() {
///     result.write_markdown("notes/report.md").unwrap();
/// }
/// ```
#[derive(Clone)]
pub struct Extractor {
    options: ExtractOptions,
    probe: Arc<dyn CapabilityProbe>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Create an extractor with default options and the built-in probe.
    pub fn new() -> Self {
        Self::with_options(ExtractOptions::default())
    }

    pub fn with_options(options: ExtractOptions) -> Self {
        Self {
            options,
            probe: Arc::new(BuiltinProbe),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.output_dir = Some(dir.into());
        self
    }

    pub fn with_markdown_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.markdown_dir = Some(dir.into());
        self
    }

    /// Drop PDF images narrower or shorter than `pixels`.
    pub fn with_min_image_size(mut self, pixels: u32) -> Self {
        self.options.parse = self.options.parse.with_min_image_size(pixels);
        self
    }

    pub fn with_mode(mut self, mode: MarkdownMode) -> Self {
        self.options.render.mode = mode;
        self
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.options.render = render;
        self
    }

    /// Switch image extraction on or off.
    pub fn with_images(mut self, enabled: bool) -> Self {
        self.options.images_enabled = enabled;
        self
    }

    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.options.deduplicate_images = enabled;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.options.parse = self.options.parse.with_parallel(parallel);
        self
    }

    /// Replace the capability probe.
    pub fn with_probe(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Ask the probe about a format.
    pub fn capability(&self, format: DocumentFormat) -> Capability {
        self.probe.probe(format)
    }

    /// Extract a document. Fatal errors produce a failed result.
    pub fn extract(&self, path: impl AsRef<Path>) -> ExtractionResult {
        let path = path.as_ref();
        match self.try_extract(path) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Extraction of {} failed: {}", path.display(), e);
                ExtractionResult::failed(path, DocumentFormat::from_path(path).ok(), e)
            }
        }
    }

    /// Extract a document, returning fatal errors directly.
    pub fn try_extract(&self, path: impl AsRef<Path>) -> Result<ExtractionResult> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let data = fs::read(path)?;
        format.validate_header(&data)?;
        log::debug!("Extracting {} as {}", path.display(), format);

        let mut diagnostics = Vec::new();
        let mut parse = self.options.parse.clone();

        match self.probe.probe(format) {
            Capability::Full => {}
            Capability::Degraded { missing, lost } => {
                let err = Error::CapabilityUnavailable {
                    format: format.to_string(),
                    missing,
                };
                log::warn!("{}; continuing without {}", err, lost);
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::CapabilityUnavailable,
                    format!("{}; {} not extracted", err, lost),
                ));
                parse = parse.text_only();
            }
            Capability::Denied { reason } => {
                return Err(Error::CapabilityDenied {
                    format: format.to_string(),
                    reason,
                });
            }
        }

        if !self.options.images_enabled && parse.wants_images() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ImagesDisabled,
                "image extraction is disabled",
            ));
            parse = parse.text_only();
        }

        let output = parser::extract(format, &data, &parse)?;
        diagnostics.extend(output.diagnostics);

        let (markdown_dir, output_dir) = self.directories(path);
        let stem = document_stem(path);
        let mut store = AssetStore::new(&output_dir, &markdown_dir, stem.as_str())?
            .with_deduplication(self.options.deduplicate_images);

        let mut persist_failures = Vec::new();
        let elements: Vec<ContentElement<StoredAsset>> = output
            .elements
            .into_iter()
            .filter_map(|element| {
                element.try_map_asset(|asset, container| match store.persist(&asset, container) {
                    Ok(stored) => Some(stored),
                    Err(e) => {
                        let err = match e {
                            e @ Error::AssetExtractionFailed { .. } => e,
                            other => Error::asset(asset.label(), other),
                        };
                        log::warn!("{}", err);
                        persist_failures.push(Diagnostic::asset_failed(&err).in_container(container));
                        None
                    }
                })
            })
            .collect();
        diagnostics.extend(store.take_diagnostics());
        diagnostics.extend(persist_failures);

        let rendered = MarkdownRenderer::new(self.options.render.clone()).render_with_stats(&elements);
        let assets: Vec<StoredAsset> = elements
            .iter()
            .filter_map(ContentElement::asset)
            .cloned()
            .collect();

        let status = if diagnostics.iter().any(Diagnostic::is_degradation) {
            ExtractionStatus::Degraded
        } else {
            ExtractionStatus::Complete
        };
        log::debug!(
            "{}: {} elements, {} images, {} diagnostics",
            path.display(),
            elements.len(),
            assets.len(),
            diagnostics.len()
        );

        Ok(ExtractionResult {
            status,
            error: None,
            document: path.to_path_buf(),
            format: Some(format),
            output_dir: Some(store.output_dir().to_path_buf()),
            elements,
            assets,
            markdown: rendered.content,
            diagnostics,
            stats: rendered.stats,
            skipped_images: output.skipped_images,
        })
    }

    fn directories(&self, document: &Path) -> (PathBuf, PathBuf) {
        let markdown_dir = match &self.options.markdown_dir {
            Some(dir) => dir.clone(),
            None => match document.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        let output_dir = match &self.options.output_dir {
            Some(dir) => dir.clone(),
            None => markdown_dir.join("images").join(document_stem(document)),
        };
        (markdown_dir, output_dir)
    }
}

fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// Extract a document with default options.
pub fn extract_document(path: impl AsRef<Path>) -> ExtractionResult {
    Extractor::new().extract(path)
}

/// Everything produced by one extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub status: ExtractionStatus,
    /// Fatal error message when `status` is `Failed`
    pub error: Option<String>,
    pub document: PathBuf,
    pub format: Option<DocumentFormat>,
    /// Absolute directory the images were written to
    pub output_dir: Option<PathBuf>,
    /// Elements in reading order, images already persisted
    pub elements: Vec<ContentElement<StoredAsset>>,
    /// One entry per image element, in order
    pub assets: Vec<StoredAsset>,
    pub markdown: String,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ExtractionStats,
    /// PDF images dropped by the minimum size filter
    pub skipped_images: usize,
}

impl ExtractionResult {
    fn failed(document: &Path, format: Option<DocumentFormat>, error: Error) -> Self {
        Self {
            status: ExtractionStatus::Failed,
            error: Some(error.to_string()),
            document: document.to_path_buf(),
            format,
            output_dir: None,
            elements: Vec::new(),
            assets: Vec::new(),
            markdown: String::new(),
            diagnostics: Vec::new(),
            stats: ExtractionStats::default(),
            skipped_images: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.status != ExtractionStatus::Failed
    }

    pub fn image_count(&self) -> usize {
        self.assets.len()
    }

    /// The result as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the Markdown to `path`, creating parent directories.
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.markdown)?;
        Ok(())
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("success", &self.success())?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.serialize_entry("document", &self.document)?;
        if let Some(format) = &self.format {
            map.serialize_entry("format", format)?;
        }
        if let Some(dir) = &self.output_dir {
            map.serialize_entry("output_dir", dir)?;
        }
        map.serialize_entry("images_count", &self.image_count())?;
        map.serialize_entry("images", &self.assets)?;
        map.serialize_entry("markdown_content", &self.markdown)?;
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("diagnostics", &self.diagnostics)?;
        map.serialize_entry("skipped_images", &self.skipped_images)?;
        map.serialize_entry("stats", &self.stats)?;
        map.end()
    }
}
