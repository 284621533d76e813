//! Content-stream scanning: positioned text spans and image placements.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::layout::TextSpan;
use crate::error::{Error, Result};

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// Default page size (US Letter) when no MediaBox is found.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Everything found on one page.
#[derive(Debug, Default)]
pub struct PageScan {
    pub spans: Vec<TextSpan>,
    pub placements: Vec<ImagePlacement>,
}

/// An image XObject drawn by a `Do` operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub id: ObjectId,
    /// Top edge of the placed unit square, in PDF user space.
    pub top: f32,
}

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands.iter().take(6).filter_map(number).collect();
        (n.len() == 6).then(|| Self::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }

    fn from_object(obj: Option<&Object>) -> Self {
        obj.and_then(|o| o.as_array().ok())
            .and_then(|arr| Self::from_operands(arr))
            .unwrap_or(Self::IDENTITY)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Highest y reached by the unit square mapped through this matrix.
    pub fn unit_square_top(&self) -> f32 {
        self.f + self.b.max(0.0) + self.d.max(0.0)
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Text state tracked between `BT` and `ET`.
#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    font_size: f32,
    font_key: Vec<u8>,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            leading: 0.0,
            font_size: 12.0,
            font_key: Vec::new(),
        }
    }
}

impl TextState {
    fn begin(&mut self) {
        self.matrix = Matrix::IDENTITY;
        self.line_matrix = Matrix::IDENTITY;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }
}

/// Walks page content streams, entering Form XObjects.
pub struct ContentScanner<'a> {
    doc: &'a Document,
}

impl<'a> ContentScanner<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    /// The page's MediaBox, inherited from ancestors when absent.
    pub fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        self.inherited(page_id, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| {
                let n: Vec<f32> = arr.iter().filter_map(|o| number(self.resolve(o))).collect();
                (n.len() == 4).then(|| [n[0].min(n[2]), n[1].min(n[3]), n[0].max(n[2]), n[1].max(n[3])])
            })
            .unwrap_or(DEFAULT_MEDIA_BOX)
    }

    /// The page's resource dictionary, inherited from ancestors when absent.
    pub fn page_resources(&self, page_id: ObjectId) -> Option<&'a Dictionary> {
        self.inherited(page_id, b"Resources")
            .and_then(|o| self.resolve_dict(o))
    }

    /// Image XObjects listed in a resource dictionary, in key order.
    pub fn resource_images(&self, resources: &'a Dictionary) -> Vec<ObjectId> {
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        else {
            return Vec::new();
        };

        xobjects
            .iter()
            .filter_map(|(_, obj)| obj.as_reference().ok())
            .filter(|id| {
                matches!(self.doc.get_object(*id), Ok(Object::Stream(s)) if is_subtype(&s.dict, b"Image"))
            })
            .collect()
    }

    /// Scan one page.
    pub fn scan_page(&self, page_id: ObjectId) -> Result<PageScan> {
        let content = self.page_content(page_id)?;
        let resources = self.page_resources(page_id);
        let mut scan = PageScan::default();
        self.scan_stream(&content, resources, Matrix::IDENTITY, &mut scan, 0)?;
        Ok(scan)
    }

    fn scan_stream(
        &self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        out: &mut PageScan,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content).map_err(|e| Error::UnreadableContainer(e.to_string()))?;
        let fonts = self.fonts(resources);

        let mut ctm = base_ctm;
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut in_text = false;

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => ctm = ctm_stack.pop().unwrap_or(base_ctm),
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "BT" => {
                    in_text = true;
                    text.begin();
                }
                "ET" => in_text = false,
                "Tf" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        text.font_key = name.clone();
                    }
                    text.font_size = operands.get(1).and_then(number).unwrap_or(12.0);
                }
                "TL" => text.leading = operands.first().and_then(number).unwrap_or(0.0),
                "Td" | "TD" => {
                    let tx = operands.first().and_then(number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        text.leading = -ty;
                    }
                    text.move_line(tx, ty);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text.matrix = m;
                        text.line_matrix = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" | "TJ" | "'" | "\"" if in_text => {
                    if op.operator != "Tj" && op.operator != "TJ" {
                        text.next_line();
                    }
                    let decoded = match op.operator.as_str() {
                        "TJ" => operands
                            .first()
                            .and_then(|o| o.as_array().ok())
                            .map(|arr| self.decode_array(&fonts, &text.font_key, arr))
                            .unwrap_or_default(),
                        "\"" => self.decode_operand(&fonts, &text.font_key, operands.get(2)),
                        _ => self.decode_operand(&fonts, &text.font_key, operands.first()),
                    };
                    if !decoded.trim().is_empty() {
                        let device = text.matrix.then(&ctm);
                        out.spans.push(TextSpan::new(
                            decoded,
                            device.e,
                            device.f,
                            text.font_size * device.vertical_scale(),
                        ));
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name, resources, ctm, out, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn draw_xobject(
        &self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        out: &mut PageScan,
        depth: usize,
    ) -> Result<()> {
        let Some(id) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| self.resolve_dict(o))
            .and_then(|x| x.get(name).ok())
            .and_then(|o| o.as_reference().ok())
        else {
            return Ok(());
        };
        let Ok(Object::Stream(stream)) = self.doc.get_object(id) else {
            return Ok(());
        };

        if is_subtype(&stream.dict, b"Image") {
            out.placements.push(ImagePlacement {
                id,
                top: ctm.unit_square_top(),
            });
        } else if is_subtype(&stream.dict, b"Form") && depth < MAX_FORM_DEPTH {
            let form_ctm = Matrix::from_object(stream.dict.get(b"Matrix").ok()).then(&ctm);
            let form_resources = stream
                .dict
                .get(b"Resources")
                .ok()
                .and_then(|o| self.resolve_dict(o))
                .or(resources);
            let data = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            if let Err(e) = self.scan_stream(&data, form_resources, form_ctm, out, depth + 1) {
                log::debug!("Skipping unreadable form XObject {:?}: {}", id, e);
            }
        }
        Ok(())
    }

    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page = self.doc.get_dictionary(page_id)?;
        let Ok(contents) = page.get(b"Contents") else {
            return Ok(Vec::new());
        };

        let refs: Vec<&Object> = match self.resolve(contents) {
            Object::Array(arr) => arr.iter().collect(),
            _ => vec![contents],
        };

        let mut content = Vec::new();
        for obj in refs {
            let s = match self.resolve(obj) {
                Object::Stream(s) => s,
                Object::Null => continue,
                _ => {
                    return Err(Error::UnreadableContainer(
                        "page contents are not a content stream".to_string(),
                    ))
                }
            };
            let data = s.decompressed_content().unwrap_or_else(|_| s.content.clone());
            content.extend_from_slice(&data);
            content.push(b'\n');
        }
        Ok(content)
    }

    fn fonts(&self, resources: Option<&'a Dictionary>) -> HashMap<Vec<u8>, &'a Dictionary> {
        let mut fonts = HashMap::new();
        let Some(font_dict) = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|o| self.resolve_dict(o))
        else {
            return fonts;
        };
        for (name, obj) in font_dict.iter() {
            if let Some(dict) = self.resolve_dict(obj) {
                fonts.insert(name.clone(), dict);
            }
        }
        fonts
    }

    fn decode_operand(
        &self,
        fonts: &HashMap<Vec<u8>, &'a Dictionary>,
        font_key: &[u8],
        operand: Option<&Object>,
    ) -> String {
        match operand {
            Some(Object::String(bytes, _)) => self.decode_bytes(fonts, font_key, bytes),
            _ => String::new(),
        }
    }

    /// Decode a `TJ` array; large negative adjustments become word spaces.
    fn decode_array(
        &self,
        fonts: &HashMap<Vec<u8>, &'a Dictionary>,
        font_key: &[u8],
        items: &[Object],
    ) -> String {
        const SPACE_THRESHOLD: f32 = 200.0;
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    combined.push_str(&self.decode_bytes(fonts, font_key, bytes))
                }
                other => {
                    let adjustment = number(other).map(|n| -n).unwrap_or(0.0);
                    let wants_space = adjustment > SPACE_THRESHOLD
                        && combined
                            .chars()
                            .last()
                            .map(|c| !c.is_whitespace() && !super::layout::is_spaceless_script_char(c))
                            .unwrap_or(false);
                    if wants_space {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }

    fn decode_bytes(&self, fonts: &HashMap<Vec<u8>, &'a Dictionary>, font_key: &[u8], bytes: &[u8]) -> String {
        fonts
            .get(font_key)
            .and_then(|dict| dict.get_font_encoding(self.doc).ok())
            .and_then(|enc| Document::decode_text(&enc, bytes).ok())
            .unwrap_or_else(|| decode_text_simple(bytes))
    }

    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
        let mut current = self.doc.get_dictionary(page_id).ok();
        for _ in 0..32 {
            let dict = current?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict
                .get(b"Parent")
                .ok()
                .and_then(|p| p.as_reference().ok())
                .and_then(|id| self.doc.get_dictionary(id).ok());
        }
        None
    }

    fn resolve(&self, obj: &'a Object) -> &'a Object {
        let mut current = obj;
        for _ in 0..16 {
            match current {
                Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(target) => current = target,
                    Err(_) => return current,
                },
                _ => return current,
            }
        }
        current
    }

    fn resolve_dict(&self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj) {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }
}

fn is_subtype(dict: &Dictionary, subtype: &[u8]) -> bool {
    dict.get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| n == subtype)
        .unwrap_or(false)
}

/// Numeric value of an integer or real operand.
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Text decoding fallback when the font has no usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
