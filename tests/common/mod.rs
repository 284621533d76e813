//! Document fixtures built in code.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const PAGE_HEIGHT: f32 = 792.0;

/// A PNG signature; office adapters pass media bytes through untouched.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

/// Something drawn on a fixture page, positioned from the top edge.
pub enum PdfItem {
    Text { top: f32, text: &'static str, size: f32 },
    Image { top: f32, side: u32 },
}

/// A single-page PDF drawing `items` in the given content-stream order.
pub fn pdf(items: &[PdfItem]) -> Vec<u8> {
    pdf_pages(&[items])
}

/// A PDF with one page per entry of `pages`.
pub fn pdf_pages(pages: &[&[PdfItem]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for items in pages {
        let mut xobjects = lopdf::Dictionary::new();
        let mut operations = Vec::new();

        for (i, item) in items.iter().enumerate() {
            match item {
                PdfItem::Text { top, text, size } => {
                    // Glyph tops sit 0.8 em above the baseline.
                    let baseline = PAGE_HEIGHT - top - size * 0.8;
                    operations.extend([
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Real(*size)]),
                        Operation::new("Td", vec![Object::Real(72.0), Object::Real(baseline)]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ]);
                }
                PdfItem::Image { top, side } => {
                    let name = format!("Im{}", i + 1);
                    let pixels = vec![0x80u8; (*side * *side * 3) as usize];
                    let image_id = doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => Object::Integer(*side as i64),
                            "Height" => Object::Integer(*side as i64),
                            "ColorSpace" => "DeviceRGB",
                            "BitsPerComponent" => Object::Integer(8),
                        },
                        pixels,
                    ));
                    xobjects.set(name.as_bytes().to_vec(), Object::Reference(image_id));

                    let side = *side as f32;
                    operations.extend([
                        Operation::new("q", vec![]),
                        Operation::new(
                            "cm",
                            vec![
                                Object::Real(side),
                                Object::Real(0.0),
                                Object::Real(0.0),
                                Object::Real(side),
                                Object::Real(72.0),
                                Object::Real(PAGE_HEIGHT - top - side),
                            ],
                        ),
                        Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                        Operation::new("Q", vec![]),
                    ]);
                }
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Real(PAGE_HEIGHT)],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Build a zip package from `(part name, content)` pairs.
pub fn zip_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Rewrite a package with `name` replaced by `content`, or dropped when `None`.
pub fn replace_part(package: &[u8], name: &str, content: Option<&[u8]>) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut bytes).unwrap();
        parts.push((file.name().to_string(), bytes));
    }
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (part, bytes) in &parts {
        let bytes = if part == name {
            match content {
                Some(replacement) => replacement,
                None => continue,
            }
        } else {
            bytes.as_slice()
        };
        writer.start_file(part.as_str(), SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL_NS, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="png" ContentType="image/png"/>
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
</Types>"#;

/// Paragraph with an optional heading style.
pub fn docx_paragraph(text: &str, style: Option<&str>) -> String {
    let ppr = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, s))
        .unwrap_or_default();
    format!("<w:p>{}<w:r><w:t>{}</w:t></w:r></w:p>", ppr, text)
}

/// Paragraph holding one inline picture with relationship `rId10`.
pub const DOCX_IMAGE: &str = r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId10"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#;

/// A DOCX whose body is `body`; `rId10` points at a PNG.
pub fn docx(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
 xmlns:r="{}"
 xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
 xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"
 xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{}</w:body></w:document>"#,
        REL_NS, body
    );
    let styles = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
</w:styles>"#;
    let root_rels = relationships(&[("rId1", "officeDocument", "word/document.xml")]);
    let doc_rels = relationships(&[
        ("rId1", "styles", "styles.xml"),
        ("rId10", "image", "media/image1.png"),
    ]);
    zip_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        ("word/document.xml", document.as_bytes()),
        ("word/_rels/document.xml.rels", doc_rels.as_bytes()),
        ("word/styles.xml", styles.as_bytes()),
        ("word/media/image1.png", PNG_BYTES),
    ])
}

/// A text shape; `title` marks it as the slide title placeholder.
pub fn pptx_text(text: &str, title: bool) -> String {
    let ph = if title { r#"<p:ph type="title"/>"# } else { "" };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Shape"/><p:cNvSpPr/><p:nvPr>{}</p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        ph, text
    )
}

/// A picture shape referencing `rId2` of its slide.
pub const PPTX_PICTURE: &str = r#"<p:pic><p:nvPicPr><p:cNvPr id="3" name="Picture"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>"#;

/// A PPTX with one slide per entry of `slides`, each a shape tree body.
pub fn pptx(slides: &[String]) -> Vec<u8> {
    let mut ids = String::new();
    let mut pres_rels = Vec::new();
    let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

    for (i, shapes) in slides.iter().enumerate() {
        let n = i + 1;
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1));
        pres_rels.push((format!("rId{}", n + 1), format!("slides/slide{}.xml", n)));

        let slide = format!(
            r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"
 xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
 xmlns:r="{}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
            REL_NS, shapes
        );
        parts.push((format!("ppt/slides/slide{}.xml", n), slide.into_bytes()));
        parts.push((
            format!("ppt/slides/_rels/slide{}.xml.rels", n),
            relationships(&[("rId2", "image", "../media/image1.png")]).into_bytes(),
        ));
    }

    let presentation = format!(
        r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="{}"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
        REL_NS, ids
    );
    let rel_refs: Vec<(&str, &str, &str)> = pres_rels
        .iter()
        .map(|(id, target)| (id.as_str(), "slide", target.as_str()))
        .collect();
    parts.push(("ppt/presentation.xml".to_string(), presentation.into_bytes()));
    parts.push((
        "ppt/_rels/presentation.xml.rels".to_string(),
        relationships(&rel_refs).into_bytes(),
    ));
    parts.push((
        "_rels/.rels".to_string(),
        relationships(&[("rId1", "officeDocument", "ppt/presentation.xml")]).into_bytes(),
    ));
    parts.push(("[Content_Types].xml".to_string(), CONTENT_TYPES.as_bytes().to_vec()));
    parts.push(("ppt/media/image1.png".to_string(), PNG_BYTES.to_vec()));

    let refs: Vec<(&str, &[u8])> = parts
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    zip_package(&refs)
}

/// Inline-string cell.
pub fn xlsx_cell(reference: &str, text: &str) -> String {
    format!(r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#, reference, text)
}

/// Numeric cell.
pub fn xlsx_number(reference: &str, value: f64) -> String {
    format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value)
}

/// A workbook with one sheet per `(name, rows, with_image)`; each row is a
/// list of cells made by [`xlsx_cell`] or [`xlsx_number`].
pub fn xlsx(sheets: &[(&str, Vec<Vec<String>>, bool)]) -> Vec<u8> {
    let mut sheet_entries = String::new();
    let mut wb_rels = Vec::new();
    let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

    for (i, (name, rows, with_image)) in sheets.iter().enumerate() {
        let n = i + 1;
        sheet_entries.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            name, n, n
        ));
        wb_rels.push((format!("rId{}", n), format!("worksheets/sheet{}.xml", n)));

        let mut data = String::new();
        for (r, cells) in rows.iter().enumerate() {
            data.push_str(&format!(r#"<row r="{}">{}</row>"#, r + 1, cells.concat()));
        }
        let drawing = if *with_image { r#"<drawing r:id="rId1"/>"# } else { "" };
        let sheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="{}"><sheetData>{}</sheetData>{}</worksheet>"#,
            REL_NS, data, drawing
        );
        parts.push((format!("xl/worksheets/sheet{}.xml", n), sheet.into_bytes()));

        if *with_image {
            parts.push((
                format!("xl/worksheets/_rels/sheet{}.xml.rels", n),
                relationships(&[("rId1", "drawing", &format!("../drawings/drawing{}.xml", n))])
                    .into_bytes(),
            ));
            let drawing = format!(
                r#"<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="{}"><xdr:oneCellAnchor><xdr:from><xdr:col>0</xdr:col><xdr:row>0</xdr:row></xdr:from><xdr:pic><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill></xdr:pic></xdr:oneCellAnchor></xdr:wsDr>"#,
                REL_NS
            );
            parts.push((format!("xl/drawings/drawing{}.xml", n), drawing.into_bytes()));
            parts.push((
                format!("xl/drawings/_rels/drawing{}.xml.rels", n),
                relationships(&[("rId1", "image", "../media/image1.png")]).into_bytes(),
            ));
        }
    }

    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="{}"><sheets>{}</sheets></workbook>"#,
        REL_NS, sheet_entries
    );
    let rel_refs: Vec<(&str, &str, &str)> = wb_rels
        .iter()
        .map(|(id, target)| (id.as_str(), "worksheet", target.as_str()))
        .collect();
    parts.push(("xl/workbook.xml".to_string(), workbook.into_bytes()));
    parts.push((
        "xl/_rels/workbook.xml.rels".to_string(),
        relationships(&rel_refs).into_bytes(),
    ));
    parts.push((
        "_rels/.rels".to_string(),
        relationships(&[("rId1", "officeDocument", "xl/workbook.xml")]).into_bytes(),
    ));
    parts.push(("[Content_Types].xml".to_string(), CONTENT_TYPES.as_bytes().to_vec()));
    parts.push(("xl/media/image1.png".to_string(), PNG_BYTES.to_vec()));

    let refs: Vec<(&str, &[u8])> = parts
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    zip_package(&refs)
}
