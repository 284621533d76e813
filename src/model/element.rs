//! Ordered content elements produced by the format adapters.

use serde::{Serialize, Serializer};

use super::asset::{ImageAsset, StoredAsset};

/// Heading level, always within 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Create a heading level, returning `None` outside 1..=6.
    pub fn new(level: u8) -> Option<Self> {
        (1..=6).contains(&level).then_some(Self(level))
    }

    /// Create a heading level, clamping into 1..=6.
    pub fn clamped(level: u8) -> Self {
        Self(level.clamp(1, 6))
    }

    /// The numeric level.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Serialize for HeadingLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

/// The page, slide or sheet an element came from.
///
/// Ordering is by variant, then by 1-based index, so sorting a set of
/// contexts yields document order within one format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerContext {
    /// Flow documents (DOCX) have no finer container.
    Document,
    /// 1-based PDF page number.
    Page(u32),
    /// 1-based slide number.
    Slide(u32),
    /// Worksheet, by 1-based workbook position and name.
    Sheet {
        /// 1-based position in the workbook.
        index: u32,
        /// Sheet name as shown in the workbook.
        name: String,
    },
}

impl ContainerContext {
    /// Human-readable origin label: `page 3`, `slide 2`, `sheet Sales`.
    pub fn label(&self) -> Option<String> {
        match self {
            ContainerContext::Document => None,
            ContainerContext::Page(n) => Some(format!("page {}", n)),
            ContainerContext::Slide(n) => Some(format!("slide {}", n)),
            ContainerContext::Sheet { name, .. } => Some(format!("sheet {}", name)),
        }
    }

    /// Title used for container headings: `Page 3`, `Slide 2`, `Sales`.
    pub fn title(&self) -> Option<String> {
        match self {
            ContainerContext::Document => None,
            ContainerContext::Page(n) => Some(format!("Page {}", n)),
            ContainerContext::Slide(n) => Some(format!("Slide {}", n)),
            ContainerContext::Sheet { name, .. } => Some(name.clone()),
        }
    }
}

/// One typed unit of document content.
///
/// Adapters emit `ContentElement<ImageAsset>`; once images are persisted the
/// facade holds `ContentElement<StoredAsset>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentElement<A = StoredAsset> {
    /// A paragraph or heading.
    Text {
        content: String,
        level: Option<HeadingLevel>,
        sequence_position: usize,
        container: ContainerContext,
    },
    /// A grid of cells; the first row is the header.
    Table {
        rows: Vec<Vec<String>>,
        sequence_position: usize,
        container: ContainerContext,
    },
    /// An embedded raster image.
    Image {
        asset: A,
        sequence_position: usize,
        container: ContainerContext,
    },
}

impl<A> ContentElement<A> {
    /// Emission order key.
    pub fn sequence_position(&self) -> usize {
        match self {
            ContentElement::Text {
                sequence_position, ..
            }
            | ContentElement::Table {
                sequence_position, ..
            }
            | ContentElement::Image {
                sequence_position, ..
            } => *sequence_position,
        }
    }

    /// Originating container.
    pub fn container(&self) -> &ContainerContext {
        match self {
            ContentElement::Text { container, .. }
            | ContentElement::Table { container, .. }
            | ContentElement::Image { container, .. } => container,
        }
    }

    /// Check if this is an image element.
    pub fn is_image(&self) -> bool {
        matches!(self, ContentElement::Image { .. })
    }

    /// The image payload, if this is an image element.
    pub fn asset(&self) -> Option<&A> {
        match self {
            ContentElement::Image { asset, .. } => Some(asset),
            _ => None,
        }
    }

    /// Transform the image payload, keeping text and tables as they are.
    ///
    /// Returning `None` from `f` drops the element; the remaining elements
    /// keep their positions.
    pub fn try_map_asset<B, F>(self, f: F) -> Option<ContentElement<B>>
    where
        F: FnOnce(A, &ContainerContext) -> Option<B>,
    {
        Some(match self {
            ContentElement::Text {
                content,
                level,
                sequence_position,
                container,
            } => ContentElement::Text {
                content,
                level,
                sequence_position,
                container,
            },
            ContentElement::Table {
                rows,
                sequence_position,
                container,
            } => ContentElement::Table {
                rows,
                sequence_position,
                container,
            },
            ContentElement::Image {
                asset,
                sequence_position,
                container,
            } => {
                let asset = f(asset, &container)?;
                ContentElement::Image {
                    asset,
                    sequence_position,
                    container,
                }
            }
        })
    }
}

/// Growable element sequence that stamps each pushed element with the next
/// sequence position.
#[derive(Debug)]
pub struct ElementSink<A = ImageAsset> {
    elements: Vec<ContentElement<A>>,
}

impl<A> Default for ElementSink<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ElementSink<A> {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    /// Create an empty sink with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    fn next_position(&self) -> usize {
        self.elements.len()
    }

    /// Push a text element. Blank text is ignored.
    pub fn push_text(
        &mut self,
        content: impl Into<String>,
        level: Option<HeadingLevel>,
        container: &ContainerContext,
    ) {
        let content = content.into();
        if content.trim().is_empty() {
            return;
        }
        let sequence_position = self.next_position();
        self.elements.push(ContentElement::Text {
            content,
            level,
            sequence_position,
            container: container.clone(),
        });
    }

    /// Push a table. Tables without rows are ignored.
    pub fn push_table(&mut self, rows: Vec<Vec<String>>, container: &ContainerContext) {
        if rows.is_empty() {
            return;
        }
        let sequence_position = self.next_position();
        self.elements.push(ContentElement::Table {
            rows,
            sequence_position,
            container: container.clone(),
        });
    }

    /// Push an image.
    pub fn push_image(&mut self, asset: A, container: &ContainerContext) {
        let sequence_position = self.next_position();
        self.elements.push(ContentElement::Image {
            asset,
            sequence_position,
            container: container.clone(),
        });
    }

    /// Number of elements pushed so far.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if nothing was pushed.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Finish and return the ordered elements.
    pub fn into_elements(self) -> Vec<ContentElement<A>> {
        self.elements
    }
}
