//! PPTX adapter: slides in presentation order, shapes in z-order.

use roxmltree::{Document as XmlDocument, Node};

use super::package::{self, Package, Relationships, NS_DRAWING, NS_REL};
use super::{AdapterOutput, ParseOptions};
use crate::error::{Error, Result};
use crate::model::{ContainerContext, Diagnostic, ElementSink, HeadingLevel, ImageAsset};

const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// Slide titles sit below the `## Slide N` container heading.
const TITLE_LEVEL: u8 = 3;

/// Extract a PPTX held in memory.
pub fn extract(data: &[u8], options: &ParseOptions) -> Result<AdapterOutput> {
    let mut package = Package::open(data)?;
    let presentation = package
        .main_document()
        .unwrap_or_else(|_| "ppt/presentation.xml".to_string());
    let slides = slide_parts(&mut package, &presentation)?;
    log::debug!("Presentation has {} slides", slides.len());

    let mut sink = ElementSink::new();
    let mut output = AdapterOutput::default();

    for (index, part) in slides.iter().enumerate() {
        let slide_num = index as u32 + 1;
        let container = ContainerContext::Slide(slide_num);

        let xml = match package.read_xml(part) {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("Skipping slide {}: {}", slide_num, e);
                output.diagnostics.push(Diagnostic::content_skipped(&container, &e));
                continue;
            }
        };
        let doc = match XmlDocument::parse(&xml) {
            Ok(doc) => doc,
            Err(e) => {
                let err = Error::from(e);
                log::warn!("Skipping malformed slide {}: {}", slide_num, err);
                output.diagnostics.push(Diagnostic::content_skipped(&container, &err));
                continue;
            }
        };

        // Text survives broken relationships; only the slide's images are lost.
        let rels = package.relationships(part).unwrap_or_else(|e| {
            log::warn!("Relationships of slide {} unreadable: {}", slide_num, e);
            output.diagnostics.push(Diagnostic::content_skipped(&container, &e));
            Relationships::default()
        });

        let Some(tree) = doc
            .descendants()
            .find(|n| package::is_element(n, NS_P, "spTree"))
        else {
            continue;
        };

        let mut walker = SlideWalker {
            package: &mut package,
            rels: &rels,
            options,
            container: &container,
            sink: &mut sink,
            output: &mut output,
            slide_num,
            image_counter: 0,
        };
        walker.walk_shapes(tree);
    }

    output.elements = sink.into_elements();
    Ok(output)
}

/// Slide part names in `p:sldIdLst` order.
fn slide_parts(package: &mut Package, presentation: &str) -> Result<Vec<String>> {
    let xml = package.read_xml(presentation).map_err(|e| {
        Error::UnreadableContainer(format!("{}: {}", presentation, e))
    })?;
    let doc = XmlDocument::parse(&xml)
        .map_err(|e| Error::UnreadableContainer(format!("{}: {}", presentation, e)))?;
    let rels = package.relationships(presentation)?;

    let slides = doc
        .descendants()
        .filter(|n| package::is_element(n, NS_P, "sldId"))
        .filter_map(|n| n.attribute((NS_REL, "id")))
        .filter_map(|id| rels.target(id))
        .map(str::to_string)
        .collect();
    Ok(slides)
}

struct SlideWalker<'a> {
    package: &'a mut Package,
    rels: &'a Relationships,
    options: &'a ParseOptions,
    container: &'a ContainerContext,
    sink: &'a mut ElementSink<ImageAsset>,
    output: &'a mut AdapterOutput,
    slide_num: u32,
    image_counter: usize,
}

impl SlideWalker<'_> {
    fn walk_shapes(&mut self, tree: Node<'_, '_>) {
        for shape in tree.children().filter(Node::is_element) {
            if shape.tag_name().namespace() != Some(NS_P) {
                // mc:AlternateContent wraps newer shape kinds; take the first choice
                if shape.tag_name().name() == "AlternateContent" {
                    if let Some(choice) = package::child(&shape, "Choice") {
                        self.walk_shapes(choice);
                    }
                }
                continue;
            }
            match shape.tag_name().name() {
                "sp" => self.text_shape(shape),
                "pic" => self.picture(shape),
                "grpSp" => self.walk_shapes(shape),
                "graphicFrame" => self.graphic_frame(shape),
                _ => {}
            }
        }
    }

    fn text_shape(&mut self, shape: Node<'_, '_>) {
        let Some(body) = package::child(&shape, "txBody") else {
            return;
        };

        let paragraphs: Vec<String> = body
            .children()
            .filter(|n| package::is_element(n, NS_DRAWING, "p"))
            .map(paragraph_text)
            .filter(|t| !t.trim().is_empty())
            .collect();

        let level = if is_title_placeholder(shape) {
            HeadingLevel::new(TITLE_LEVEL)
        } else {
            None
        };
        self.sink.push_text(paragraphs.join("\n"), level, self.container);

        // Picture fills on ordinary shapes
        if self.options.wants_images() {
            if let Some(sp_pr) = package::child(&shape, "spPr") {
                for rel_id in package::blip_embeds(&sp_pr) {
                    self.push_image(rel_id);
                }
            }
        }
    }

    fn picture(&mut self, pic: Node<'_, '_>) {
        if !self.options.wants_images() {
            return;
        }
        for rel_id in package::blip_embeds(&pic) {
            self.push_image(rel_id);
        }
    }

    fn graphic_frame(&mut self, frame: Node<'_, '_>) {
        let Some(table) = frame
            .descendants()
            .find(|n| package::is_element(n, NS_DRAWING, "tbl"))
        else {
            return;
        };

        let rows: Vec<Vec<String>> = table
            .children()
            .filter(|n| package::is_element(n, NS_DRAWING, "tr"))
            .map(|tr| {
                tr.children()
                    .filter(|n| package::is_element(n, NS_DRAWING, "tc"))
                    .map(|tc| {
                        tc.descendants()
                            .filter(|n| package::is_element(n, NS_DRAWING, "p"))
                            .map(paragraph_text)
                            .filter(|t| !t.trim().is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect()
            })
            .filter(|row: &Vec<String>| !row.is_empty())
            .collect();

        self.sink.push_table(rows, self.container);
    }

    fn push_image(&mut self, rel_id: &str) {
        let label = format!("slide_{}_img_{}", self.slide_num, self.image_counter + 1);

        let result = match self.rels.target(rel_id) {
            Some(target) => self.package.read_part(target).map(|bytes| {
                let format = self.package.image_format(target, &bytes);
                ImageAsset::new(bytes, format, label.as_str()).with_probed_dimensions()
            }),
            None => Err(Error::asset(
                &label,
                format!("relationship {} has no internal target", rel_id),
            )),
        };

        match result {
            Ok(asset) if !asset.is_empty() => {
                self.image_counter += 1;
                self.sink.push_image(asset, self.container);
            }
            Ok(_) => {
                let err = Error::asset(&label, "image part is empty");
                self.output
                    .diagnostics
                    .push(Diagnostic::asset_failed(&err).in_container(self.container));
            }
            Err(e) => {
                let err = match e {
                    e @ Error::AssetExtractionFailed { .. } => e,
                    other => Error::asset(&label, other),
                };
                log::warn!("{}", err);
                self.output
                    .diagnostics
                    .push(Diagnostic::asset_failed(&err).in_container(self.container));
            }
        }
    }
}

/// Text of an `a:p`: runs, fields and line breaks.
fn paragraph_text(p: Node<'_, '_>) -> String {
    let mut text = String::new();
    for node in p.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "r" | "fld" => {
                if let Some(t) = package::child(&node, "t") {
                    text.push_str(t.text().unwrap_or(""));
                }
            }
            "br" => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn is_title_placeholder(shape: Node<'_, '_>) -> bool {
    shape
        .descendants()
        .filter(|n| package::is_element(n, NS_P, "ph"))
        .any(|ph| matches!(ph.attribute("type"), Some("title") | Some("ctrTitle")))
}
