//! DOCX adapter: the document body in XML order.

use std::collections::HashMap;

use roxmltree::{Document as XmlDocument, Node};

use super::package::{self, Package, Relationships, NS_REL};
use super::{AdapterOutput, ParseOptions};
use crate::error::{Error, Result};
use crate::model::{ContainerContext, Diagnostic, ElementSink, HeadingLevel, ImageAsset};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_W_STRICT: &str = "http://purl.oclc.org/ooxml/wordprocessingml/main";
const NS_VML: &str = "urn:schemas-microsoft-com:vml";

const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Extract a DOCX held in memory.
pub fn extract(data: &[u8], options: &ParseOptions) -> Result<AdapterOutput> {
    let mut package = Package::open(data)?;
    let main = package
        .main_document()
        .unwrap_or_else(|_| DEFAULT_MAIN_PART.to_string());
    if !package.has_part(&main) {
        return Err(Error::UnreadableContainer(format!("missing {}", main)));
    }

    let rels = package.relationships(&main)?;
    let styles = match rels.first_of_type("/styles").map(|r| r.target.clone()) {
        Some(part) => load_styles(&mut package, &part),
        None => StyleMap::default(),
    };

    let xml = package.read_xml(&main)?;
    let doc = XmlDocument::parse(&xml)
        .map_err(|e| Error::UnreadableContainer(format!("{}: {}", main, e)))?;
    let body = doc
        .root_element()
        .children()
        .find(|n| is_w(n, "body"))
        .ok_or_else(|| Error::UnreadableContainer(format!("{} has no body", main)))?;

    let mut walker = BodyWalker {
        package: &mut package,
        rels: &rels,
        styles: &styles,
        options,
        sink: ElementSink::new(),
        output: AdapterOutput::default(),
        image_counter: 0,
    };
    walker.walk_blocks(body);

    let BodyWalker {
        sink, mut output, ..
    } = walker;
    output.elements = sink.into_elements();
    Ok(output)
}

/// Style id to heading level.
#[derive(Debug, Default)]
struct StyleMap {
    names: HashMap<String, String>,
}

impl StyleMap {
    fn heading_level(&self, style_id: &str) -> Option<HeadingLevel> {
        let name = self.names.get(style_id).map(String::as_str).unwrap_or(style_id);
        heading_level_for_style(name).or_else(|| heading_level_for_style(style_id))
    }
}

fn load_styles(package: &mut Package, part: &str) -> StyleMap {
    let mut styles = StyleMap::default();
    let Ok(xml) = package.read_xml(part) else {
        return styles;
    };
    let Ok(doc) = XmlDocument::parse(&xml) else {
        log::warn!("Ignoring malformed {}", part);
        return styles;
    };

    for style in doc.root_element().children().filter(|n| is_w(n, "style")) {
        let Some(id) = w_attr(&style, "styleId") else {
            continue;
        };
        if let Some(name) = style
            .children()
            .find(|n| is_w(n, "name"))
            .and_then(|n| w_attr(&n, "val"))
        {
            styles.names.insert(id.to_string(), name.to_string());
        }
    }
    styles
}

/// `heading 1`..`heading 6` (any case, optional space) and `Title`.
fn heading_level_for_style(name: &str) -> Option<HeadingLevel> {
    let lower = name.trim().to_ascii_lowercase();
    if lower == "title" {
        return HeadingLevel::new(1);
    }
    let rest = lower.strip_prefix("heading")?.trim_start();
    let level: u8 = rest.parse().ok()?;
    HeadingLevel::new(level)
}

struct BodyWalker<'p, 'o> {
    package: &'p mut Package,
    rels: &'p Relationships,
    styles: &'p StyleMap,
    options: &'o ParseOptions,
    sink: ElementSink<ImageAsset>,
    output: AdapterOutput,
    image_counter: usize,
}

impl BodyWalker<'_, '_> {
    fn walk_blocks(&mut self, parent: Node<'_, '_>) {
        for node in parent.children().filter(Node::is_element) {
            match node.tag_name().name() {
                "p" if is_w(&node, "p") => self.paragraph(node),
                "tbl" if is_w(&node, "tbl") => self.table(node),
                "sdt" | "customXml" | "ins" | "smartTag" => {
                    match node.children().find(|n| is_w(n, "sdtContent")) {
                        Some(content) => self.walk_blocks(content),
                        None => self.walk_blocks(node),
                    }
                }
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, p: Node<'_, '_>) {
        // Only the first fragment of a split heading keeps the level.
        let mut level = p
            .children()
            .find(|n| is_w(n, "pPr"))
            .and_then(|ppr| ppr.children().find(|n| is_w(n, "pStyle")))
            .and_then(|s| w_attr(&s, "val"))
            .and_then(|id| self.styles.heading_level(id));

        let mut pieces = Vec::new();
        collect_inline(p, &mut pieces);

        let mut text = String::new();
        for piece in pieces {
            match piece {
                Inline::Text(t) => text.push_str(&t),
                Inline::Image(rel_id) => {
                    if !self.options.wants_images() {
                        continue;
                    }
                    self.push_fragment(&mut text, &mut level);
                    if let Some(asset) = self.image(rel_id) {
                        self.sink.push_image(asset, &ContainerContext::Document);
                    }
                }
            }
        }
        self.push_fragment(&mut text, &mut level);
    }

    fn push_fragment(&mut self, text: &mut String, level: &mut Option<HeadingLevel>) {
        let fragment = std::mem::take(text);
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            self.sink
                .push_text(fragment, level.take(), &ContainerContext::Document);
        }
    }

    fn table(&mut self, tbl: Node<'_, '_>) {
        let mut rows = Vec::new();
        let mut cell_images = Vec::new();

        for tr in tbl.children().filter(|n| is_w(n, "tr")) {
            let mut row = Vec::new();
            for tc in tr.children().filter(|n| is_w(n, "tc")) {
                let mut paragraphs = Vec::new();
                for p in tc.descendants().filter(|n| is_w(n, "p")) {
                    let mut pieces = Vec::new();
                    collect_inline(p, &mut pieces);
                    let mut text = String::new();
                    for piece in pieces {
                        match piece {
                            Inline::Text(t) => text.push_str(&t),
                            Inline::Image(rel_id) => cell_images.push(rel_id),
                        }
                    }
                    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                }
                row.push(paragraphs.join(" "));
            }
            if !row.is_empty() {
                rows.push(row);
            }
        }

        self.sink.push_table(rows, &ContainerContext::Document);

        if self.options.wants_images() {
            for rel_id in cell_images {
                if let Some(asset) = self.image(rel_id) {
                    self.sink.push_image(asset, &ContainerContext::Document);
                }
            }
        }
    }

    /// Resolve an image relationship and read its bytes.
    fn image(&mut self, rel_id: String) -> Option<ImageAsset> {
        let label = format!("docx_img_{}", self.image_counter + 1);

        let Some(target) = self.rels.target(&rel_id).map(str::to_string) else {
            let err = Error::asset(&label, format!("relationship {} has no internal target", rel_id));
            log::warn!("{}", err);
            self.output.diagnostics.push(Diagnostic::asset_failed(&err));
            return None;
        };

        match self.package.read_part(&target) {
            Ok(bytes) if !bytes.is_empty() => {
                let format = self.package.image_format(&target, &bytes);
                self.image_counter += 1;
                Some(ImageAsset::new(bytes, format, label).with_probed_dimensions())
            }
            Ok(_) => {
                let err = Error::asset(&label, format!("{} is empty", target));
                self.output.diagnostics.push(Diagnostic::asset_failed(&err));
                None
            }
            Err(e) => {
                let err = Error::asset(&label, e);
                log::warn!("{}", err);
                self.output.diagnostics.push(Diagnostic::asset_failed(&err));
                None
            }
        }
    }
}

/// Inline content of a paragraph in run order.
#[derive(Debug, PartialEq)]
enum Inline {
    Text(String),
    Image(String),
}

fn collect_inline(node: Node<'_, '_>, out: &mut Vec<Inline>) {
    for child in node.children().filter(Node::is_element) {
        if is_w(&child, "t") {
            out.push(Inline::Text(child.text().unwrap_or("").to_string()));
        } else if is_w(&child, "tab") {
            out.push(Inline::Text("\t".to_string()));
        } else if is_w(&child, "br") || is_w(&child, "cr") {
            out.push(Inline::Text("\n".to_string()));
        } else if is_w(&child, "drawing") {
            for rel_id in package::blip_embeds(&child) {
                out.push(Inline::Image(rel_id.to_string()));
            }
        } else if is_w(&child, "pict") || is_w(&child, "object") {
            for image in child
                .descendants()
                .filter(|n| package::is_element(n, NS_VML, "imagedata"))
            {
                if let Some(rel_id) = image.attribute((NS_REL, "id")) {
                    out.push(Inline::Image(rel_id.to_string()));
                }
            }
        } else if is_w(&child, "pPr") || is_w(&child, "rPr") || is_w(&child, "del") {
            // properties and tracked deletions carry no visible text
        } else if child.tag_name().name() == "Fallback" {
            // mc:Fallback repeats its mc:Choice sibling
        } else {
            collect_inline(child, out);
        }
    }
}

fn is_w(node: &Node<'_, '_>, local: &str) -> bool {
    package::is_element(node, NS_W, local) || package::is_element(node, NS_W_STRICT, local)
}

fn w_attr<'a>(node: &Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attribute((NS_W, local))
        .or_else(|| node.attribute((NS_W_STRICT, local)))
}
