//! End-to-end extraction through the public facade.

mod common;

use std::fs;
use std::path::Path;

use common::{
    docx, docx_paragraph, pdf, pdf_pages, pptx, pptx_text, replace_part, xlsx, xlsx_cell,
    xlsx_number, PdfItem, DOCX_IMAGE, PPTX_PICTURE,
};
use docmark::{
    extract_document, Capability, ContainerContext, ContentElement, DiagnosticKind, Error,
    ExtractionStatus, Extractor, MarkdownMode,
};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn kinds(elements: &[ContentElement]) -> Vec<&'static str> {
    elements
        .iter()
        .map(|e| match e {
            ContentElement::Text { level: Some(_), .. } => "heading",
            ContentElement::Text { .. } => "text",
            ContentElement::Table { .. } => "table",
            ContentElement::Image { .. } => "image",
        })
        .collect()
}

#[cfg(feature = "raster")]
#[test]
fn test_pdf_image_above_text_comes_first() {
    let dir = TempDir::new().unwrap();
    // The text is drawn first in the content stream but sits lower on the page.
    let path = write(
        dir.path(),
        "doc.pdf",
        &pdf(&[
            PdfItem::Text { top: 100.0, text: "Body text", size: 12.0 },
            PdfItem::Image { top: 50.0, side: 60 },
        ]),
    );

    let result = Extractor::new().extract(&path);
    assert_eq!(result.status, ExtractionStatus::Complete, "{:?}", result.error);
    assert_eq!(kinds(&result.elements), vec!["image", "text"]);
    assert_eq!(result.image_count(), 1);

    let asset = &result.assets[0];
    assert_eq!(asset.filename, "page_1_img_1.png");
    assert_eq!(asset.relative_path, "images/doc/page_1_img_1.png");
    assert_eq!(asset.container, ContainerContext::Page(1));
    assert!(asset.absolute_path.is_file());

    let image_at = result.markdown.find("![").unwrap();
    let text_at = result.markdown.find("Body text").unwrap();
    assert!(image_at < text_at, "{}", result.markdown);
    assert!(result.markdown.starts_with("## Page 1"));
}

#[cfg(feature = "raster")]
#[test]
fn test_pdf_small_images_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "icons.pdf",
        &pdf(&[
            PdfItem::Image { top: 10.0, side: 16 },
            PdfItem::Text { top: 100.0, text: "Caption", size: 12.0 },
        ]),
    );

    let result = Extractor::new().extract(&path);
    assert_eq!(result.image_count(), 0);
    assert_eq!(result.skipped_images, 1);

    let result = Extractor::new().with_min_image_size(8).extract(&path);
    assert_eq!(result.image_count(), 1);
    assert_eq!(result.skipped_images, 0);
}

#[test]
fn test_pdf_without_images_allowed_is_degraded() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "doc.pdf",
        &pdf(&[
            PdfItem::Image { top: 50.0, side: 60 },
            PdfItem::Text { top: 100.0, text: "Only text survives", size: 12.0 },
        ]),
    );

    let result = Extractor::new()
        .with_probe(|_format: docmark::DocumentFormat| Capability::Degraded {
            missing: "raster image decoding".to_string(),
            lost: "embedded images".to_string(),
        })
        .extract(&path);

    assert_eq!(result.status, ExtractionStatus::Degraded);
    assert!(result.success());
    assert!(result.assets.is_empty());
    assert!(result.markdown.contains("Only text survives"));
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::CapabilityUnavailable));
    assert!(!dir.path().join("images").exists());
}

#[test]
fn test_pdf_unreadable_page_is_reported() {
    let dir = TempDir::new().unwrap();
    let bytes = pdf_pages(&[
        &[PdfItem::Text { top: 100.0, text: "First page", size: 12.0 }],
        &[PdfItem::Text { top: 100.0, text: "Lost page", size: 12.0 }],
    ]);
    let mut doc = lopdf::Document::load_mem(&bytes).unwrap();
    let second = doc.get_pages()[&2];
    doc.get_object_mut(second)
        .and_then(|page| page.as_dict_mut())
        .unwrap()
        .set("Contents", lopdf::Object::Integer(0));
    let mut broken = Vec::new();
    doc.save_to(&mut broken).unwrap();
    let path = write(dir.path(), "doc.pdf", &broken);

    let result = Extractor::new().extract(&path);
    assert_eq!(result.status, ExtractionStatus::Degraded);
    assert!(result.markdown.contains("First page"));
    assert!(!result.markdown.contains("Lost page"));
    let skipped: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::ContentSkipped)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].container, Some(ContainerContext::Page(2)));
}

#[test]
fn test_docx_order_and_headings() {
    let dir = TempDir::new().unwrap();
    let body = [
        docx_paragraph("Overview", Some("Heading1")),
        docx_paragraph("First paragraph.", None),
        DOCX_IMAGE.to_string(),
        docx_paragraph("After the figure.", None),
    ]
    .concat();
    let path = write(dir.path(), "report.docx", &docx(&body));

    let result = extract_document(&path);
    assert_eq!(result.status, ExtractionStatus::Complete);
    assert_eq!(kinds(&result.elements), vec!["heading", "text", "image", "text"]);
    assert_eq!(result.assets[0].relative_path, "images/report/docx_img_1.png");

    let md = &result.markdown;
    assert!(md.starts_with("# Overview"), "{}", md);
    let first = md.find("First paragraph.").unwrap();
    let image = md.find("](images/report/docx_img_1.png)").unwrap();
    let after = md.find("After the figure.").unwrap();
    assert!(first < image && image < after);
}

#[test]
fn test_pptx_slides_and_shape_order() {
    let dir = TempDir::new().unwrap();
    let slides = vec![
        [pptx_text("Welcome", true), PPTX_PICTURE.to_string()].concat(),
        [PPTX_PICTURE.to_string(), pptx_text("Picture first", false)].concat(),
    ];
    let path = write(dir.path(), "deck.pptx", &pptx(&slides));

    let result = Extractor::new().extract(&path);
    assert_eq!(kinds(&result.elements), vec!["heading", "image", "image", "text"]);
    assert_eq!(result.assets[0].filename, "slide_1_img_1.png");
    assert_eq!(result.assets[1].filename, "slide_2_img_1.png");
    assert_eq!(result.assets[1].container, ContainerContext::Slide(2));

    let md = &result.markdown;
    let slide2 = md.find("## Slide 2").unwrap();
    assert!(md.find("### Welcome").unwrap() < slide2);
    assert!(md.find("slide_2_img_1.png").unwrap() < md.find("Picture first").unwrap());
}

#[test]
fn test_xlsx_table_then_images() {
    let dir = TempDir::new().unwrap();
    let sales = vec![
        vec![xlsx_cell("A1", " ")],
        vec![xlsx_cell("A2", "Region"), xlsx_cell("B2", "Total")],
        vec![xlsx_cell("A3", "North"), xlsx_number("B3", 12.5)],
        vec![xlsx_cell("A4", "South")],
    ];
    let notes = vec![vec![xlsx_cell("A1", "Checked")]];
    let path = write(
        dir.path(),
        "book.xlsx",
        &xlsx(&[("Sales", sales, true), ("Notes", notes, false)]),
    );

    let result = Extractor::new().extract(&path);
    assert_eq!(result.status, ExtractionStatus::Complete, "{:?}", result.error);
    assert_eq!(kinds(&result.elements), vec!["table", "image", "table"]);

    match &result.elements[0] {
        ContentElement::Table { rows, .. } => {
            assert_eq!(rows[0], vec!["Region", "Total"]);
            assert_eq!(rows.len(), 3);
            assert_eq!(rows[2][0], "South");
        }
        other => panic!("expected a table, got {:?}", other),
    }
    assert_eq!(result.assets[0].filename, "sheet_Sales_img_1.png");

    let md = &result.markdown;
    assert!(md.contains("## Sales"));
    assert!(md.contains("| Region | Total |"));
    assert!(md.contains("| South |  |"), "{}", md);
    assert!(md.find("## Notes").unwrap() > md.find("sheet_Sales_img_1.png").unwrap());
}

#[test]
fn test_pptx_malformed_slide_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "deck.pptx",
        &pptx(&[pptx_text("Kept", false), "<p:sp>".to_string()]),
    );

    let result = Extractor::new().extract(&path);
    assert_eq!(result.status, ExtractionStatus::Degraded);
    assert!(result.success());
    assert!(result.markdown.contains("Kept"));
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ContentSkipped);
    assert_eq!(result.diagnostics[0].container, Some(ContainerContext::Slide(2)));
}

#[test]
fn test_xlsx_missing_sheet_is_reported() {
    let dir = TempDir::new().unwrap();
    let book = xlsx(&[
        ("Sales", vec![vec![xlsx_cell("A1", "Region")]], false),
        ("Costs", vec![vec![xlsx_cell("A1", "Item")]], false),
    ]);
    let book = replace_part(&book, "xl/worksheets/sheet2.xml", None);
    let path = write(dir.path(), "book.xlsx", &book);

    let result = Extractor::new().extract(&path);
    assert_eq!(result.status, ExtractionStatus::Degraded, "{:?}", result.error);
    assert!(result.markdown.contains("Region"));
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ContentSkipped);
    assert!(matches!(
        &result.diagnostics[0].container,
        Some(ContainerContext::Sheet { index: 2, name }) if name == "Costs"
    ));
}

#[test]
fn test_xlsx_unresolvable_images_are_reported() {
    let dir = TempDir::new().unwrap();
    let book = xlsx(&[("Charts", vec![vec![xlsx_cell("A1", "Figure")]], true)]);
    let root_rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/missing.xml"/></Relationships>"#;
    let book = replace_part(&book, "_rels/.rels", Some(root_rels.as_bytes()));
    let path = write(dir.path(), "book.xlsx", &book);

    let result = Extractor::new().extract(&path);
    assert_eq!(result.status, ExtractionStatus::Degraded, "{:?}", result.error);
    assert!(result.markdown.contains("Figure"));
    assert_eq!(result.image_count(), 0);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::ContentSkipped && d.container.is_none()));
}

#[test]
fn test_image_modes() {
    let dir = TempDir::new().unwrap();
    let slides = vec![
        [pptx_text("One", true), PPTX_PICTURE.to_string()].concat(),
        [pptx_text("Two", true), PPTX_PICTURE.to_string()].concat(),
    ];
    let path = write(dir.path(), "deck.pptx", &pptx(&slides));

    let simple = Extractor::new()
        .with_mode(MarkdownMode::Simple)
        .with_output_dir(dir.path().join("simple"))
        .extract(&path);
    assert!(!simple.markdown.contains('#'));
    assert!(!simple.markdown.contains("One"));
    assert_eq!(simple.markdown.lines().count(), 2);

    let grouped = Extractor::new()
        .with_mode(MarkdownMode::Grouped)
        .with_output_dir(dir.path().join("grouped"))
        .extract(&path);
    let first = grouped.markdown.find("### Slide 1 Images").unwrap();
    let second = grouped.markdown.find("### Slide 2 Images").unwrap();
    assert!(first < second);
    assert_eq!(grouped.markdown.matches("### ").count(), 2);
}

#[test]
fn test_name_collisions_get_suffixes() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "report.docx",
        &docx(&[DOCX_IMAGE, DOCX_IMAGE].concat()),
    );

    // A second run into the same directory must not overwrite the first.
    let first = extract_document(&path);
    let second = extract_document(&path);
    assert_eq!(first.assets[0].filename, "docx_img_1.png");
    assert_eq!(first.assets[1].filename, "docx_img_2.png");
    assert_eq!(second.assets[0].filename, "docx_img_1_1.png");
    assert_eq!(second.assets[1].filename, "docx_img_2_1.png");
}

#[test]
fn test_deduplication_reuses_files() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "report.docx",
        &docx(&[DOCX_IMAGE, DOCX_IMAGE].concat()),
    );

    let result = Extractor::new().with_deduplication(true).extract(&path);
    assert_eq!(result.image_count(), 2);
    assert_eq!(result.assets[0].relative_path, result.assets[1].relative_path);
    let files = fs::read_dir(dir.path().join("images").join("report")).unwrap().count();
    assert_eq!(files, 1);
}

#[test]
fn test_images_disabled() {
    let dir = TempDir::new().unwrap();
    let body = [docx_paragraph("Text", None), DOCX_IMAGE.to_string()].concat();
    let path = write(dir.path(), "report.docx", &docx(&body));

    let result = Extractor::new().with_images(false).extract(&path);
    assert_eq!(result.status, ExtractionStatus::Complete);
    assert!(result.assets.is_empty());
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ImagesDisabled);
    assert_eq!(result.markdown, "Text");
}

#[test]
fn test_markdown_dir_controls_links() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "report.docx", &docx(DOCX_IMAGE));

    let result = Extractor::new()
        .with_markdown_dir(dir.path().join("notes"))
        .with_output_dir(dir.path().join("assets"))
        .extract(&path);
    assert_eq!(result.assets[0].relative_path, "../assets/docx_img_1.png");
}

#[test]
fn test_corrupt_documents_fail_cleanly() {
    let dir = TempDir::new().unwrap();
    for name in ["bad.pdf", "bad.docx", "bad.pptx", "bad.xlsx"] {
        let path = write(dir.path(), name, b"definitely not a document");

        let err = Extractor::new().try_extract(&path).unwrap_err();
        assert!(matches!(err, Error::UnreadableContainer(_)), "{}: {}", name, err);

        let result = Extractor::new().extract(&path);
        assert_eq!(result.status, ExtractionStatus::Failed);
        assert!(result.markdown.is_empty());
        assert!(result.assets.is_empty());
        assert!(result.error.is_some());
    }
    assert!(!dir.path().join("images").exists());
}

#[test]
fn test_result_json() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "report.docx", &docx(DOCX_IMAGE));

    let result = extract_document(&path);
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["format"], "docx");
    assert_eq!(json["images_count"], 1);
    assert_eq!(json["images"][0]["filename"], "docx_img_1.png");
    assert_eq!(json["status"], "complete");
    assert!(json["markdown_content"].as_str().unwrap().contains("docx_img_1.png"));
}

#[test]
fn test_image_count_matches_assets_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "report.docx",
        &docx(&[DOCX_IMAGE, DOCX_IMAGE, DOCX_IMAGE].concat()),
    );

    let result = extract_document(&path);
    let images = result.elements.iter().filter(|e| e.is_image()).count();
    assert_eq!(images, result.assets.len());
    for asset in &result.assets {
        assert!(asset.absolute_path.is_file());
        assert_eq!(fs::metadata(&asset.absolute_path).unwrap().len(), asset.byte_size);
    }
}
