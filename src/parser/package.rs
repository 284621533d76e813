//! Open Packaging Conventions: the zip container shared by DOCX, PPTX and XLSX.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use roxmltree::{Document as XmlDocument, Node};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::ImageFormat;

pub(crate) const NS_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

const OFFICE_DOCUMENT: &str = "/officeDocument";

/// An opened OOXML package.
pub struct Package {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    content_types: ContentTypes,
}

impl Package {
    /// Open a package from its bytes.
    pub fn open(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data.to_vec()))?;
        let content_types = match read_entry(&mut archive, "[Content_Types].xml") {
            Ok(bytes) => ContentTypes::parse(&into_string(bytes)?)?,
            Err(_) => ContentTypes::default(),
        };
        Ok(Self {
            archive,
            content_types,
        })
    }

    /// Check whether a part exists. Part names have no leading slash.
    pub fn has_part(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    /// Read a part's raw bytes.
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>> {
        read_entry(&mut self.archive, name)
    }

    /// Read a part as UTF-8 text.
    pub fn read_xml(&mut self, name: &str) -> Result<String> {
        into_string(self.read_part(name)?)
    }

    /// Content type of a part from `[Content_Types].xml`.
    pub fn content_type(&self, name: &str) -> Option<&str> {
        self.content_types.lookup(name)
    }

    /// Image format of a media part: content type, then magic bytes, then PNG.
    pub fn image_format(&self, name: &str, bytes: &[u8]) -> ImageFormat {
        match self.content_type(name) {
            Some(ct) if ct.starts_with("image/") => ImageFormat::from_content_type(ct),
            _ => ImageFormat::sniff(bytes).unwrap_or(ImageFormat::Png),
        }
    }

    /// Relationships of a part. A part without a `.rels` file has none.
    pub fn relationships(&mut self, part: &str) -> Result<Relationships> {
        let rels_name = rels_part_name(part);
        if !self.has_part(&rels_name) {
            return Ok(Relationships::default());
        }
        let xml = self.read_xml(&rels_name)?;
        Relationships::parse(&xml, part)
    }

    /// Name of the main document part (`word/document.xml` and friends).
    pub fn main_document(&mut self) -> Result<String> {
        let rels = self.relationships("")?;
        rels.first_of_type(OFFICE_DOCUMENT)
            .map(|r| r.target.clone())
            .ok_or_else(|| {
                Error::UnreadableContainer("package has no main document part".to_string())
            })
    }
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name)?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
    let bytes = if bytes.starts_with(&BOM) {
        bytes[BOM.len()..].to_vec()
    } else {
        bytes
    };
    String::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`; the package itself -> `_rels/.rels`.
fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize_part(absolute);
    }
    let base = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    if base.is_empty() {
        normalize_part(&target)
    } else {
        normalize_part(&format!("{}/{}", base, target))
    }
}

fn normalize_part(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// One relationship of a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Resolved part name, or the raw URI for external targets
    pub target: String,
    pub external: bool,
}

/// The relationships declared by one part, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    items: Vec<Relationship>,
    by_id: HashMap<String, usize>,
}

impl Relationships {
    fn parse(xml: &str, source_part: &str) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        let mut rels = Relationships::default();

        for node in doc
            .root_element()
            .children()
            .filter(|n| n.tag_name().name() == "Relationship")
        {
            let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) else {
                continue;
            };
            let external = node.attribute("TargetMode") == Some("External");
            let target = if external {
                target.to_string()
            } else {
                resolve_target(source_part, target)
            };
            rels.by_id.insert(id.to_string(), rels.items.len());
            rels.items.push(Relationship {
                id: id.to_string(),
                rel_type: node.attribute("Type").unwrap_or("").to_string(),
                target,
                external,
            });
        }
        Ok(rels)
    }

    /// Look up a relationship by id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    /// Internal target part of a relationship id.
    pub fn target(&self, id: &str) -> Option<&str> {
        self.get(id)
            .filter(|r| !r.external)
            .map(|r| r.target.as_str())
    }

    /// First relationship whose type ends with `suffix`.
    pub fn first_of_type(&self, suffix: &str) -> Option<&Relationship> {
        self.items
            .iter()
            .find(|r| !r.external && r.rel_type.ends_with(suffix))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    fn parse(xml: &str) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        let mut types = ContentTypes::default();
        for node in doc.root_element().children().filter(Node::is_element) {
            let Some(content_type) = node.attribute("ContentType") else {
                continue;
            };
            match node.tag_name().name() {
                "Default" => {
                    if let Some(ext) = node.attribute("Extension") {
                        types
                            .defaults
                            .insert(ext.to_ascii_lowercase(), content_type.to_string());
                    }
                }
                "Override" => {
                    if let Some(part) = node.attribute("PartName") {
                        types.overrides.insert(
                            part.trim_start_matches('/').to_string(),
                            content_type.to_string(),
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(types)
    }

    fn lookup(&self, part: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(part.trim_start_matches('/')) {
            return Some(ct.as_str());
        }
        let ext = part.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }
}

/// Element test by namespace URI and local name.
pub(crate) fn is_element(node: &Node<'_, '_>, namespace: &str, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(namespace)
}

/// First child element with the given local name, any namespace.
pub(crate) fn child<'a, 'input>(node: &Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

/// Relationship ids of the `a:blip` images under `node`, in document order.
pub(crate) fn blip_embeds<'a>(node: &Node<'a, '_>) -> Vec<&'a str> {
    node.descendants()
        .filter(|n| is_element(n, NS_DRAWING, "blip"))
        .filter_map(|n| n.attribute((NS_REL, "embed")))
        .collect()
}
