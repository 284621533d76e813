//! # docmark
//!
//! Office document to Markdown extraction that keeps text and images in
//! reading order.
//!
//! PDF, DOCX, PPTX and XLSX files are reduced to one ordered sequence of
//! text, table and image elements. Images are written next to the Markdown
//! and referenced at the position where they appeared in the source.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docmark::Extractor;
//!
//! let result = Extractor::new()
//!     .with_markdown_dir("out")
//!     .extract("slides.pptx");
//!
//! if result.success() {
//!     println!("{} images", result.image_count());
//!     result.write_markdown("out/slides.md")?;
//! }
//! # Ok::<(), docmark::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Reading order**: PDF images are placed by their vertical position on the
//!   page; office formats follow document, shape and sheet order
//! - **Containers**: page, slide and sheet headings in the Markdown
//! - **Images-only modes**: flat, grouped and inline image reference lists
//! - **Fallback policy**: missing capabilities degrade to text-only with a
//!   diagnostic instead of failing
//! - **Cleanup pipeline**: Unicode and whitespace normalization of text
//! - **Parallel layout**: PDF line and block grouping uses Rayon

pub mod assets;
pub mod capability;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod render;

pub use assets::AssetStore;
pub use capability::{BuiltinProbe, Capability, CapabilityProbe, FixedProbe};
pub use config::Config;
pub use detect::{is_supported, sniff_bytes, DocumentFormat};
pub use error::{Error, Result};
pub use extract::{extract_document, ExtractOptions, ExtractionResult, ExtractionStatus, Extractor};
pub use model::{
    ContainerContext, ContentElement, Diagnostic, DiagnosticKind, HeadingLevel, ImageAsset,
    ImageFormat, StoredAsset,
};
pub use parser::{ExtractMode, ParseOptions};
pub use render::{CleanupOptions, CleanupPreset, ExtractionStats, MarkdownMode, RenderOptions};

use std::path::Path;

/// Convert a document to Markdown, writing its images under
/// `images/<stem>` next to the document.
///
/// # Example
///
/// ```no_run
/// let markdown = docmark::to_markdown("report.docx").unwrap();
/// std::fs::write("report.md", markdown).unwrap();
/// ```
pub fn to_markdown<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(Extractor::new().try_extract(path)?.markdown)
}

/// Extract only the text and tables of a document as Markdown.
///
/// Nothing is written to disk.
pub fn to_markdown_text_only<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(Extractor::new().with_images(false).try_extract(path)?.markdown)
}
