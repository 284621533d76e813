//! PDF adapter.
//!
//! Pages are scanned for positioned text spans and image placements, the
//! spans are grouped into blocks with document-wide heading detection, and
//! each page's blocks and images are merged by vertical position.

mod content;
mod layout;
mod merge;
mod xobject;

use std::collections::HashSet;

use lopdf::{Document as LopdfDocument, Object, ObjectId};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{ContainerContext, Diagnostic, ElementSink, ImageAsset};

use super::{AdapterOutput, ParseOptions};
use content::{ContentScanner, PageScan};
use layout::{SizeRanking, TextBlock, TextLine};
use merge::{merge_page, PageItem, Positioned};

/// PDF adapter over an in-memory document.
pub struct PdfAdapter {
    doc: LopdfDocument,
    options: ParseOptions,
}

impl PdfAdapter {
    /// Load a PDF from bytes.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        if doc.is_encrypted() {
            return Err(Error::UnreadableContainer(
                "document is password-protected".to_string(),
            ));
        }
        Ok(Self { doc, options })
    }

    /// Extract the ordered elements of every page.
    pub fn extract(&self) -> Result<AdapterOutput> {
        let pages: Vec<(u32, ObjectId)> = self.doc.get_pages().into_iter().collect();
        let scanner = ContentScanner::new(&self.doc);

        let mut output = AdapterOutput::default();
        let mut page_spans = Vec::with_capacity(pages.len());
        let mut page_images = Vec::with_capacity(pages.len());

        for &(page_num, page_id) in &pages {
            let scan = scanner.scan_page(page_id).unwrap_or_else(|e| {
                log::warn!("Failed to read content of page {}: {}", page_num, e);
                output
                    .diagnostics
                    .push(Diagnostic::content_skipped(&ContainerContext::Page(page_num), &e));
                PageScan::default()
            });
            let media_box = scanner.media_box(page_id);

            let images = if self.options.wants_images() {
                self.page_images(&scanner, page_num, page_id, &scan, media_box, &mut output)
            } else {
                Vec::new()
            };

            page_spans.push((scan.spans, media_box));
            page_images.push(images);
        }

        // Layout does not touch the document, so it can run per page in parallel.
        let page_lines: Vec<(Vec<TextLine>, [f32; 4])> = if self.options.parallel {
            page_spans
                .into_par_iter()
                .map(|(spans, mb)| (layout::group_spans_into_lines(spans), mb))
                .collect()
        } else {
            page_spans
                .into_iter()
                .map(|(spans, mb)| (layout::group_spans_into_lines(spans), mb))
                .collect()
        };

        let ranking = SizeRanking::from_sizes(
            page_lines
                .iter()
                .flat_map(|(lines, _)| lines.iter().map(|line| line.font_size)),
        );
        log::debug!(
            "Body font size {:.1}pt, {} heading sizes",
            ranking.body_size,
            ranking.tiers.len()
        );

        let build_blocks = |(lines, mb): (Vec<TextLine>, [f32; 4])| -> Vec<Positioned<TextBlock>> {
            let page_top = mb[3];
            layout::group_lines_into_blocks(layout::detect_headings(lines, &ranking))
                .into_iter()
                .map(|block| Positioned::new(page_top - block.top(), block))
                .collect()
        };
        let page_blocks: Vec<Vec<Positioned<TextBlock>>> = if self.options.parallel {
            page_lines.into_par_iter().map(build_blocks).collect()
        } else {
            page_lines.into_iter().map(build_blocks).collect()
        };

        let mut sink = ElementSink::new();
        for ((&(page_num, _), blocks), images) in pages.iter().zip(page_blocks).zip(page_images) {
            let container = ContainerContext::Page(page_num);
            for item in merge_page(blocks, images) {
                match item {
                    PageItem::Text(block) => {
                        sink.push_text(block.text(), block.heading, &container)
                    }
                    PageItem::Image(asset) => sink.push_image(asset, &container),
                }
            }
        }

        output.elements = sink.into_elements();
        Ok(output)
    }

    /// Decode the images of one page, placed ones first.
    ///
    /// Images referenced by the page resources but never drawn by the
    /// content stream are kept and positioned at the bottom of the page.
    fn page_images(
        &self,
        scanner: &ContentScanner<'_>,
        page_num: u32,
        page_id: ObjectId,
        scan: &PageScan,
        media_box: [f32; 4],
        output: &mut AdapterOutput,
    ) -> Vec<Positioned<ImageAsset>> {
        let page_top = media_box[3];
        let page_height = media_box[3] - media_box[1];
        let container = ContainerContext::Page(page_num);

        let mut seen = HashSet::new();
        let mut discovered: Vec<(ObjectId, f32)> = Vec::new();
        for placement in &scan.placements {
            if seen.insert(placement.id) {
                discovered.push((placement.id, page_top - placement.top));
            }
        }
        if let Some(resources) = scanner.page_resources(page_id) {
            for id in scanner.resource_images(resources) {
                if seen.insert(id) {
                    discovered.push((id, page_height));
                }
            }
        }

        let mut images = Vec::new();
        for (index, (id, top)) in discovered.into_iter().enumerate() {
            let label = format!("page_{}_img_{}", page_num, index + 1);
            let Ok(Object::Stream(stream)) = self.doc.get_object(id) else {
                let err = Error::asset(&label, format!("object {} {} is not an image stream", id.0, id.1));
                output
                    .diagnostics
                    .push(Diagnostic::asset_failed(&err).in_container(&container));
                continue;
            };

            if let Some((w, h)) = xobject::declared_dimensions(&self.doc, &stream.dict) {
                if !self.options.keeps_image(w, h) {
                    log::debug!("Skipping small image {} ({}x{})", label, w, h);
                    output.skipped_images += 1;
                    continue;
                }
            }

            match xobject::decode_image(&self.doc, stream, &label) {
                Ok(asset) => images.push(Positioned::new(top, asset)),
                Err(e) => {
                    log::warn!("{}", e);
                    output
                        .diagnostics
                        .push(Diagnostic::asset_failed(&e).in_container(&container));
                }
            }
        }
        images
    }
}

/// Extract a PDF held in memory.
pub fn extract(data: &[u8], options: &ParseOptions) -> Result<AdapterOutput> {
    PdfAdapter::from_bytes_with_options(data, options.clone())?.extract()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_unreadable() {
        let err = extract(b"%PDF-1.7\nnot really a pdf", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnreadableContainer(_) | Error::Io(_)));
        assert!(err.is_fatal());
    }
}
