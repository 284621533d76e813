//! XLSX adapter: one table per worksheet, then the sheet's anchored images.
//!
//! Cell values come from `calamine`. Images are not exposed by `calamine`,
//! so they are resolved from the package: workbook sheet, sheet drawing,
//! drawing anchors. Anchors only locate an image loosely on the grid, so a
//! sheet's images always follow its table, in anchor order.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, ExcelDateTime, Range, Reader, Xlsx};
use chrono::NaiveTime;
use roxmltree::Document as XmlDocument;

use super::package::{self, Package, NS_REL};
use super::{AdapterOutput, ParseOptions};
use crate::error::{Error, Result};
use crate::model::{ContainerContext, Diagnostic, ElementSink, ImageAsset, ImageFormat};

const NS_XDR: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const ANCHORS: [&str; 3] = ["twoCellAnchor", "oneCellAnchor", "absoluteAnchor"];

/// Extract an XLSX held in memory.
pub fn extract(data: &[u8], options: &ParseOptions) -> Result<AdapterOutput> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data.to_vec()))?;
    let sheet_names = workbook.sheet_names();

    let mut sink = ElementSink::new();
    let mut output = AdapterOutput::default();

    let mut sheet_images = if options.wants_images() {
        SheetImages::open(data).unwrap_or_else(|e| {
            log::warn!("Workbook images unavailable: {}", e);
            output
                .diagnostics
                .push(Diagnostic::content_skipped(&ContainerContext::Document, &e));
            SheetImages::default()
        })
    } else {
        SheetImages::default()
    };

    for (index, name) in sheet_names.iter().enumerate() {
        let container = ContainerContext::Sheet {
            index: index as u32 + 1,
            name: name.clone(),
        };

        match workbook.worksheet_range(name) {
            Ok(range) => sink.push_table(table_rows(&range), &container),
            Err(e) => {
                let err = Error::from(e);
                log::warn!("Skipping cells of sheet '{}': {}", name, err);
                output.diagnostics.push(Diagnostic::content_skipped(&container, &err));
            }
        }

        if options.wants_images() {
            for (i, result) in sheet_images.images(name).into_iter().enumerate() {
                let label = format!("sheet_{}_img_{}", name, i + 1);
                match result {
                    Ok((part, bytes)) if !bytes.is_empty() => {
                        let format = sheet_images.image_format(&part, &bytes);
                        let asset = ImageAsset::new(bytes, format, label).with_probed_dimensions();
                        sink.push_image(asset, &container);
                    }
                    Ok((part, _)) => {
                        let err = Error::asset(&label, format!("{} is empty", part));
                        output
                            .diagnostics
                            .push(Diagnostic::asset_failed(&err).in_container(&container));
                    }
                    Err(e) => {
                        let err = Error::asset(&label, e);
                        log::warn!("{}", err);
                        output
                            .diagnostics
                            .push(Diagnostic::asset_failed(&err).in_container(&container));
                    }
                }
            }
        }
    }

    output.elements = sink.into_elements();
    Ok(output)
}

/// Cell text of every row that has at least one non-blank cell.
pub fn table_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .filter(|row| !row.iter().all(is_blank))
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(value) => datetime_text(value),
        other => other.to_string(),
    }
}

/// Dates as `YYYY-MM-DD`, with the time only when it is not midnight.
/// Durations as `H:MM:SS`.
fn datetime_text(value: &ExcelDateTime) -> String {
    if value.is_duration() {
        if let Some(duration) = value.as_duration() {
            let secs = duration.num_seconds();
            return format!("{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60);
        }
    }
    match value.as_datetime() {
        Some(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => value.as_f64().to_string(),
    }
}

/// Image lookup through the package relationships.
#[derive(Default)]
struct SheetImages {
    package: Option<Package>,
    /// Sheet name to worksheet part
    sheets: HashMap<String, String>,
}

impl SheetImages {
    fn open(data: &[u8]) -> Result<Self> {
        let mut package = Package::open(data)?;
        let sheets = sheet_parts(&mut package)?;
        Ok(Self {
            package: Some(package),
            sheets,
        })
    }

    fn image_format(&self, part: &str, bytes: &[u8]) -> ImageFormat {
        match &self.package {
            Some(package) => package.image_format(part, bytes),
            None => ImageFormat::sniff(bytes).unwrap_or(ImageFormat::Png),
        }
    }

    /// Media parts of a sheet's pictures in anchor order, with their bytes.
    fn images(&mut self, sheet: &str) -> Vec<Result<(String, Vec<u8>)>> {
        let (Some(package), Some(sheet_part)) = (self.package.as_mut(), self.sheets.get(sheet)) else {
            return Vec::new();
        };

        let drawing = match package.relationships(sheet_part) {
            Ok(rels) => match rels.first_of_type("/drawing") {
                Some(rel) => rel.target.clone(),
                None => return Vec::new(),
            },
            Err(e) => return vec![Err(e)],
        };

        let embeds = match drawing_embeds(package, &drawing) {
            Ok(embeds) => embeds,
            Err(e) => return vec![Err(e)],
        };
        let rels = match package.relationships(&drawing) {
            Ok(rels) => rels,
            Err(e) => return vec![Err(e)],
        };

        embeds
            .into_iter()
            .map(|rel_id| {
                let target = rels.target(&rel_id).ok_or_else(|| {
                    Error::Xml(format!("{} has no target for {}", drawing, rel_id))
                })?;
                let bytes = package.read_part(target)?;
                Ok((target.to_string(), bytes))
            })
            .collect()
    }
}

/// Sheet name to worksheet part, from `xl/workbook.xml`.
fn sheet_parts(package: &mut Package) -> Result<HashMap<String, String>> {
    let workbook = package
        .main_document()
        .unwrap_or_else(|_| "xl/workbook.xml".to_string());
    let xml = package.read_xml(&workbook)?;
    let doc = XmlDocument::parse(&xml)?;
    let rels = package.relationships(&workbook)?;

    let mut sheets = HashMap::new();
    for sheet in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "sheet")
    {
        let (Some(name), Some(rel_id)) = (sheet.attribute("name"), sheet.attribute((NS_REL, "id")))
        else {
            continue;
        };
        if let Some(target) = rels.target(rel_id) {
            sheets.insert(name.to_string(), target.to_string());
        }
    }
    Ok(sheets)
}

/// Picture relationship ids of a drawing part, in anchor order.
fn drawing_embeds(pkg: &mut Package, drawing: &str) -> Result<Vec<String>> {
    let xml = pkg.read_xml(drawing)?;
    let doc = XmlDocument::parse(&xml)?;

    let mut embeds = Vec::new();
    let anchors = doc.descendants().filter(|n| {
        ANCHORS.iter().any(|a| package::is_element(n, NS_XDR, a))
            && !n.ancestors().any(|p| p.tag_name().name() == "Fallback")
    });
    for anchor in anchors {
        for pic in anchor
            .descendants()
            .filter(|n| package::is_element(n, NS_XDR, "pic"))
        {
            embeds.extend(package::blip_embeds(&pic).into_iter().map(str::to_string));
        }
    }
    Ok(embeds)
}
