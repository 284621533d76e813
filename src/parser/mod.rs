//! Format adapters.
//!
//! Each adapter turns one container format into an ordered list of
//! [`ContentElement`]s whose images are still in memory. Writing images to
//! disk is left to the [`AssetStore`](crate::assets::AssetStore).

pub mod docx;
mod options;
mod package;
pub mod pdf;
pub mod pptx;
pub mod xlsx;

use crate::detect::DocumentFormat;
use crate::error::Result;
use crate::model::{ContentElement, Diagnostic, ImageAsset};

pub use options::{ExtractMode, ParseOptions, DEFAULT_MIN_IMAGE_SIZE};
pub use package::Package;

/// What an adapter hands back for one document.
#[derive(Debug, Default)]
pub struct AdapterOutput {
    /// Elements in reading order
    pub elements: Vec<ContentElement<ImageAsset>>,

    /// Non-fatal problems, one per skipped element
    pub diagnostics: Vec<Diagnostic>,

    /// Images dropped by the minimum size filter
    pub skipped_images: usize,
}

impl AdapterOutput {
    /// Iterate over the in-memory images, in order.
    pub fn images(&self) -> impl Iterator<Item = &ImageAsset> {
        self.elements.iter().filter_map(ContentElement::asset)
    }

    /// Number of images carried by the elements.
    pub fn image_count(&self) -> usize {
        self.images().count()
    }
}

/// Run the adapter for `format` over the document bytes.
pub fn extract(format: DocumentFormat, data: &[u8], options: &ParseOptions) -> Result<AdapterOutput> {
    let output = match format {
        DocumentFormat::Pdf => pdf::extract(data, options)?,
        DocumentFormat::Docx => docx::extract(data, options)?,
        DocumentFormat::Pptx => pptx::extract(data, options)?,
        DocumentFormat::Xlsx => xlsx::extract(data, options)?,
    };

    log::debug!(
        "{} adapter produced {} elements ({} images, {} skipped, {} diagnostics)",
        format,
        output.elements.len(),
        output.image_count(),
        output.skipped_images,
        output.diagnostics.len()
    );
    Ok(output)
}
