//! Spatial merge of text blocks and images on a page.

/// An item with the vertical offset of its top edge, measured downward
/// from the top of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Positioned<T> {
    pub top: f32,
    pub item: T,
}

impl<T> Positioned<T> {
    pub fn new(top: f32, item: T) -> Self {
        Self { top, item }
    }
}

/// One entry of a merged page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem<T, I> {
    Text(T),
    Image(I),
}

/// Interleave text and images by top-down position.
///
/// The sort is stable over "text first, then images", so when a text block
/// and an image share the same offset the text comes first, and items of
/// the same kind keep their input order.
pub fn merge_page<T, I>(text: Vec<Positioned<T>>, images: Vec<Positioned<I>>) -> Vec<PageItem<T, I>> {
    let mut items: Vec<(f32, PageItem<T, I>)> = Vec::with_capacity(text.len() + images.len());
    items.extend(text.into_iter().map(|p| (p.top, PageItem::Text(p.item))));
    items.extend(images.into_iter().map(|p| (p.top, PageItem::Image(p.item))));

    items.sort_by(|a, b| a.0.total_cmp(&b.0));
    items.into_iter().map(|(_, item)| item).collect()
}
