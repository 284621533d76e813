//! Markdown rendering for ordered content elements.

use std::collections::BTreeMap;

use crate::model::{ContainerContext, ContentElement, HeadingLevel, StoredAsset};

use super::{CleanupPipeline, ExtractionStats, MarkdownMode, RenderOptions, RenderResult};

/// Render elements with default options in the given mode.
pub fn render(elements: &[ContentElement<StoredAsset>], mode: MarkdownMode) -> String {
    MarkdownRenderer::new(RenderOptions::default().with_mode(mode)).render(elements)
}

/// Render elements to Markdown with statistics.
pub fn to_markdown_with_stats(
    elements: &[ContentElement<StoredAsset>],
    options: &RenderOptions,
) -> RenderResult {
    MarkdownRenderer::new(options.clone()).render_with_stats(elements)
}

/// Markdown renderer.
pub struct MarkdownRenderer {
    options: RenderOptions,
    cleanup: Option<CleanupPipeline>,
    stats: ExtractionStats,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions) -> Self {
        let cleanup = options.cleanup.clone().map(CleanupPipeline::new);
        Self {
            options,
            cleanup,
            stats: ExtractionStats::new(),
        }
    }

    /// Render elements to Markdown.
    pub fn render(mut self, elements: &[ContentElement<StoredAsset>]) -> String {
        self.render_internal(elements)
    }

    /// Render elements to Markdown with statistics.
    pub fn render_with_stats(mut self, elements: &[ContentElement<StoredAsset>]) -> RenderResult {
        let content = self.render_internal(elements);
        self.stats.count_text(&content);
        RenderResult::new(content, self.stats)
    }

    fn render_internal(&mut self, elements: &[ContentElement<StoredAsset>]) -> String {
        let mut ordered: Vec<&ContentElement<StoredAsset>> = elements.iter().collect();
        ordered.sort_by_key(|e| e.sequence_position());

        let mut output = String::new();
        match self.options.mode {
            MarkdownMode::FullContent => self.render_full(&mut output, &ordered),
            MarkdownMode::Simple => self.render_image_list(&mut output, &ordered, false),
            MarkdownMode::Inline => self.render_image_list(&mut output, &ordered, true),
            MarkdownMode::Grouped => self.render_grouped(&mut output, &ordered),
        }
        output.trim().to_string()
    }

    fn render_full(&mut self, output: &mut String, elements: &[&ContentElement<StoredAsset>]) {
        let mut current: Option<&ContainerContext> = None;

        for element in elements {
            let container = element.container();
            if current != Some(container) {
                if let Some(title) = container.title() {
                    if current.is_some() && self.options.container_separators {
                        output.push_str("---\n\n");
                    }
                    if self.options.container_headings {
                        output.push_str("## ");
                        output.push_str(&title);
                        output.push_str("\n\n");
                    }
                    self.stats.add_container();
                }
                current = Some(container);
            }

            match element {
                ContentElement::Text { content, level, .. } => {
                    self.render_text(output, content, *level)
                }
                ContentElement::Table { rows, .. } => {
                    self.stats.add_table();
                    self.render_table(output, rows);
                }
                ContentElement::Image {
                    asset, container, ..
                } => {
                    self.stats.add_image();
                    output.push_str(&image_reference(asset, container));
                    output.push_str("\n\n");
                }
            }
        }
    }

    fn render_text(&mut self, output: &mut String, content: &str, level: Option<HeadingLevel>) {
        let mut text = match &self.cleanup {
            Some(pipeline) => pipeline.process(content),
            None => content.trim().to_string(),
        };
        if text.is_empty() {
            return;
        }
        if self.options.escape_special_chars {
            text = escape_markdown(&text);
        }

        match level {
            Some(level) => {
                self.stats.add_heading();
                let level = level.get().min(self.options.max_heading_level);
                output.push_str(&"#".repeat(level as usize));
                output.push(' ');
                output.push_str(&text.split_whitespace().collect::<Vec<_>>().join(" "));
            }
            None => {
                self.stats.add_paragraph();
                output.push_str(&text);
            }
        }
        output.push_str("\n\n");
    }

    fn render_table(&self, output: &mut String, rows: &[Vec<String>]) {
        let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        if col_count == 0 {
            return;
        }

        for (i, row) in rows.iter().enumerate() {
            output.push('|');
            for col in 0..col_count {
                let cell = row.get(col).map(String::as_str).unwrap_or("");
                output.push(' ');
                output.push_str(&self.table_cell(cell));
                output.push_str(" |");
            }
            output.push('\n');

            // Separator after header row
            if i == 0 {
                output.push('|');
                for _ in 0..col_count {
                    output.push_str(" --- |");
                }
                output.push('\n');
            }
        }

        output.push('\n');
    }

    fn table_cell(&self, cell: &str) -> String {
        let text = cell
            .trim()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("<br>");
        if self.options.escape_special_chars {
            escape_markdown(&text)
        } else {
            text.replace('|', "\\|")
        }
    }

    fn render_image_list(
        &mut self,
        output: &mut String,
        elements: &[&ContentElement<StoredAsset>],
        blank_line_after: bool,
    ) {
        for element in elements {
            if let ContentElement::Image {
                asset, container, ..
            } = element
            {
                self.stats.add_image();
                output.push_str(&image_reference(asset, container));
                output.push('\n');
                if blank_line_after {
                    output.push('\n');
                }
            }
        }
    }

    fn render_grouped(&mut self, output: &mut String, elements: &[&ContentElement<StoredAsset>]) {
        let mut groups: BTreeMap<&ContainerContext, Vec<&StoredAsset>> = BTreeMap::new();
        for element in elements {
            if let ContentElement::Image {
                asset, container, ..
            } = element
            {
                groups.entry(container).or_default().push(asset);
            }
        }

        for (container, assets) in groups {
            self.stats.add_container();
            output.push_str("### ");
            output.push_str(&group_title(container));
            output.push_str("\n\n");
            for asset in assets {
                self.stats.add_image();
                output.push_str(&image_reference(asset, container));
                output.push_str("\n\n");
            }
        }
    }
}

/// `![alt](relative/path)` for one stored image.
pub fn image_reference(asset: &StoredAsset, container: &ContainerContext) -> String {
    format!(
        "![{}]({})",
        alt_text(asset, container),
        link_destination(&asset.relative_path)
    )
}

/// A path as a CommonMark link destination. Paths with spaces, parentheses
/// or angle brackets are wrapped in `<...>`.
fn link_destination(path: &str) -> String {
    if !path.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>')) {
        return path.to_string();
    }
    let mut dest = String::with_capacity(path.len() + 2);
    dest.push('<');
    for c in path.chars() {
        match c {
            '<' | '>' => {
                dest.push('\\');
                dest.push(c);
            }
            '\n' | '\r' => dest.push(' '),
            _ => dest.push(c),
        }
    }
    dest.push('>');
    dest
}

/// Alt text built from the origin and, when known, the pixel size.
///
/// ```
/// # use docmark::model::{ContainerContext, ImageFormat, StoredAsset};
/// # let asset = StoredAsset {
/// #     absolute_path: "/tmp/a.png".into(), filename: "a.png".into(),
/// #     filename_stem: "a".into(), extension: "png".into(),
/// #     relative_path: "a.png".into(), container: ContainerContext::Page(2),
/// #     width: Some(640), height: Some(480), byte_size: 1,
/// #     format: ImageFormat::Png, content_hash: String::new(),
/// # };
/// let alt = docmark::render::alt_text(&asset, &ContainerContext::Page(2));
/// assert_eq!(alt, "Image from page 2 (640x480)");
/// ```
pub fn alt_text(asset: &StoredAsset, container: &ContainerContext) -> String {
    let mut alt = String::from("Image");
    if let Some(label) = container.label() {
        alt.push_str(" from ");
        alt.push_str(&label);
    }
    if let Some(dims) = asset.dimensions_label() {
        alt.push_str(&format!(" ({})", dims));
    }
    alt.replace(['[', ']'], "")
}

fn group_title(container: &ContainerContext) -> String {
    match container {
        ContainerContext::Document => "Document Images".to_string(),
        ContainerContext::Page(n) => format!("Page {} Images", n),
        ContainerContext::Slide(n) => format!("Slide {} Images", n),
        ContainerContext::Sheet { name, .. } => format!("Sheet {} Images", name),
    }
}

/// Escape special Markdown characters.
/// Only escape characters that could be misinterpreted as Markdown syntax.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}
