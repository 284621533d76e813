//! Image payloads before and after they are written to disk.

use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::element::ContainerContext;

/// Output raster formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Map a package content type to a format. Unrecognized types fall back to PNG.
    pub fn from_content_type(content_type: &str) -> Self {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("jpeg") || lower.contains("jpg") {
            ImageFormat::Jpeg
        } else if lower.contains("gif") {
            ImageFormat::Gif
        } else if lower.contains("bmp") {
            ImageFormat::Bmp
        } else {
            ImageFormat::Png
        }
    }

    /// Map a file extension to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" | "jpe" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "bmp" | "dib" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// Detect the format from magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if data.starts_with(b"BM") && data.len() > 14 {
            Some(ImageFormat::Bmp)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// An extracted image that has not been written yet.
///
/// Built once by an adapter and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: Option<u32>,
    height: Option<u32>,
    label: String,
}

impl ImageAsset {
    /// Create an asset from encoded bytes and an origin label such as `page_3_img_2`.
    pub fn new(bytes: Vec<u8>, format: ImageFormat, label: impl Into<String>) -> Self {
        Self {
            bytes,
            format,
            width: None,
            height: None,
            label: label.into(),
        }
    }

    /// Set pixel dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Read pixel dimensions from the encoded header when they are not known yet.
    pub fn with_probed_dimensions(self) -> Self {
        if self.width.is_some() && self.height.is_some() {
            return self;
        }
        match probe_dimensions(&self.bytes) {
            Some((w, h)) => self.with_dimensions(w, h),
            None => self,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAsset")
            .field("label", &self.label)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Serialize for ImageAsset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry("format", &self.format)?;
        map.serialize_entry("width", &self.width)?;
        map.serialize_entry("height", &self.height)?;
        map.serialize_entry("size_bytes", &self.bytes.len())?;
        map.end()
    }
}

#[cfg(feature = "raster")]
fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[cfg(not(feature = "raster"))]
fn probe_dimensions(_bytes: &[u8]) -> Option<(u32, u32)> {
    None
}

/// An image written to disk, with the link used from the Markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Absolute path of the written file.
    pub absolute_path: PathBuf,
    /// File name including extension.
    pub filename: String,
    /// File name without extension.
    pub filename_stem: String,
    /// Extension without the dot.
    pub extension: String,
    /// Forward-slash path from the Markdown directory to the file.
    pub relative_path: String,
    /// Where the image came from.
    pub container: ContainerContext,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Size of the written file.
    pub byte_size: u64,
    pub format: ImageFormat,
    /// Hex MD5 of the encoded bytes.
    pub content_hash: String,
}

impl StoredAsset {
    /// `WxH` when both dimensions are known.
    pub fn dimensions_label(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }
}

/// Serialized with the origin flattened into `page`, `slide` or `sheet`.
impl Serialize for StoredAsset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("filename", &self.filename)?;
        map.serialize_entry("path", &self.absolute_path)?;
        map.serialize_entry("relative_path", &self.relative_path)?;
        match &self.container {
            ContainerContext::Document => {}
            ContainerContext::Page(n) => map.serialize_entry("page", n)?,
            ContainerContext::Slide(n) => map.serialize_entry("slide", n)?,
            ContainerContext::Sheet { name, .. } => map.serialize_entry("sheet", name)?,
        }
        if let Some(w) = self.width {
            map.serialize_entry("width", &w)?;
        }
        if let Some(h) = self.height {
            map.serialize_entry("height", &h)?;
        }
        map.serialize_entry("format", &self.format)?;
        map.serialize_entry("size_bytes", &self.byte_size)?;
        map.serialize_entry("content_hash", &self.content_hash)?;
        map.end()
    }
}
