//! Image XObject decoding.
//!
//! JPEG streams in gray or RGB are passed through untouched. Everything else
//! that can be decoded (flate or unfiltered samples in gray, RGB, CMYK or
//! indexed color, 1-bit masks, CMYK JPEG) is converted to RGB and written
//! as PNG. Other filters fail with [`Error::AssetExtractionFailed`].

use lopdf::{Dictionary, Document, Object, Stream};

use crate::error::{Error, Result};
use crate::model::{ImageAsset, ImageFormat};

/// Width and height declared in the image dictionary.
pub fn declared_dimensions(doc: &Document, dict: &Dictionary) -> Option<(u32, u32)> {
    let width = dict_u32(doc, dict, b"Width")?;
    let height = dict_u32(doc, dict, b"Height")?;
    Some((width, height))
}

/// Decode an image XObject into an asset labelled `label`.
pub fn decode_image(doc: &Document, stream: &Stream, label: &str) -> Result<ImageAsset> {
    let (width, height) = declared_dimensions(doc, &stream.dict)
        .filter(|&(w, h)| w > 0 && h > 0)
        .ok_or_else(|| Error::asset(label, "missing image dimensions"))?;

    let filters = filter_names(doc, &stream.dict);
    let color_space = if is_image_mask(doc, &stream.dict) {
        ColorSpace::Gray
    } else {
        match stream.dict.get(b"ColorSpace") {
            Ok(obj) => ColorSpace::resolve(doc, obj, 0)
                .ok_or_else(|| Error::asset(label, "unsupported color space"))?,
            Err(_) => ColorSpace::Gray,
        }
    };

    match filters.as_slice() {
        [only] if only.as_slice() == b"DCTDecode" => {
            decode_jpeg(stream.content.clone(), &color_space, width, height, label)
        }
        _ if filters.iter().any(|f| !is_sample_filter(f)) => {
            let names: Vec<String> = filters
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            Err(Error::asset(label, format!("unsupported filter {}", names.join("+"))))
        }
        _ => {
            let samples = if filters.is_empty() {
                stream.content.clone()
            } else {
                stream
                    .decompressed_content()
                    .map_err(|e| Error::asset(label, e))?
            };
            let bits = dict_u32(doc, &stream.dict, b"BitsPerComponent").unwrap_or(8);
            let rgb = samples_to_rgb(&samples, width, height, bits, &color_space)
                .ok_or_else(|| Error::asset(label, "truncated or malformed image data"))?;
            let png = encode_png(rgb, width, height, label)?;
            Ok(ImageAsset::new(png, ImageFormat::Png, label).with_dimensions(width, height))
        }
    }
}

fn decode_jpeg(
    data: Vec<u8>,
    color_space: &ColorSpace,
    width: u32,
    height: u32,
    label: &str,
) -> Result<ImageAsset> {
    if color_space.components() != 4 {
        return Ok(ImageAsset::new(data, ImageFormat::Jpeg, label).with_dimensions(width, height));
    }
    cmyk_jpeg_to_png(&data, label)
}

#[cfg(feature = "raster")]
fn cmyk_jpeg_to_png(data: &[u8], label: &str) -> Result<ImageAsset> {
    let decoded = ::image::load_from_memory_with_format(data, ::image::ImageFormat::Jpeg)
        .map_err(|e| Error::asset(label, e))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let png = encode_png(rgb.into_raw(), width, height, label)?;
    Ok(ImageAsset::new(png, ImageFormat::Png, label).with_dimensions(width, height))
}

#[cfg(not(feature = "raster"))]
fn cmyk_jpeg_to_png(_data: &[u8], label: &str) -> Result<ImageAsset> {
    Err(Error::asset(label, "CMYK JPEG conversion requires the raster feature"))
}

#[cfg(feature = "raster")]
fn encode_png(rgb: Vec<u8>, width: u32, height: u32, label: &str) -> Result<Vec<u8>> {
    use std::io::Cursor;

    let buffer = ::image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| Error::asset(label, "pixel buffer does not match dimensions"))?;
    let mut out = Cursor::new(Vec::new());
    ::image::DynamicImage::ImageRgb8(buffer)
        .write_to(&mut out, ::image::ImageFormat::Png)
        .map_err(|e| Error::asset(label, e))?;
    Ok(out.into_inner())
}

#[cfg(not(feature = "raster"))]
fn encode_png(_rgb: Vec<u8>, _width: u32, _height: u32, label: &str) -> Result<Vec<u8>> {
    Err(Error::asset(label, "PNG encoding requires the raster feature"))
}

/// Color spaces that can be converted to RGB.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn resolve(doc: &Document, obj: &Object, depth: usize) -> Option<Self> {
        if depth > 4 {
            return None;
        }
        match resolve(doc, obj) {
            Object::Name(name) => Self::from_name(name),
            Object::Array(arr) => {
                let family = arr.first().and_then(|o| resolve(doc, o).as_name().ok())?;
                match family {
                    b"ICCBased" => {
                        let n = arr
                            .get(1)
                            .and_then(|o| match resolve(doc, o) {
                                Object::Stream(s) => dict_u32(doc, &s.dict, b"N"),
                                _ => None,
                            })
                            .unwrap_or(3);
                        match n {
                            1 => Some(ColorSpace::Gray),
                            4 => Some(ColorSpace::Cmyk),
                            _ => Some(ColorSpace::Rgb),
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = Self::resolve(doc, arr.get(1)?, depth + 1)?;
                        let lookup = match resolve(doc, arr.get(3)?) {
                            Object::String(bytes, _) => bytes.clone(),
                            Object::Stream(s) => s
                                .decompressed_content()
                                .unwrap_or_else(|_| s.content.clone()),
                            _ => return None,
                        };
                        Some(ColorSpace::Indexed {
                            base: Box::new(base),
                            lookup,
                        })
                    }
                    b"CalRGB" => Some(ColorSpace::Rgb),
                    b"CalGray" => Some(ColorSpace::Gray),
                    other => Self::from_name(other),
                }
            }
            _ => None,
        }
    }

    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"DeviceGray" | b"CalGray" | b"G" => Some(ColorSpace::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::Cmyk),
            _ => None,
        }
    }

    /// Samples per pixel in the image data.
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    /// Convert one pixel's 8-bit components to RGB.
    fn to_rgb(&self, px: &[u8], out: &mut Vec<u8>) -> Option<()> {
        match self {
            ColorSpace::Gray => out.extend_from_slice(&[px[0], px[0], px[0]]),
            ColorSpace::Rgb => out.extend_from_slice(&px[..3]),
            ColorSpace::Cmyk => out.extend_from_slice(&cmyk_to_rgb(px[0], px[1], px[2], px[3])),
            ColorSpace::Indexed { base, lookup } => {
                let n = base.components();
                let start = px[0] as usize * n;
                let entry = lookup.get(start..start + n)?;
                base.to_rgb(entry, out)?;
            }
        }
        Some(())
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let channel = |v: u8| ((255 - v as u32) * (255 - k as u32) / 255) as u8;
    [channel(c), channel(m), channel(y)]
}

/// Unpack rows of `bits`-wide samples and convert every pixel to RGB.
fn samples_to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    bits: u32,
    color_space: &ColorSpace,
) -> Option<Vec<u8>> {
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return None;
    }
    let width = width as usize;
    let height = height as usize;
    let components = color_space.components();
    // Dimensions are untrusted; anything that overflows cannot match the data.
    let row_bytes = width
        .checked_mul(components)?
        .checked_mul(bits as usize)?
        .div_ceil(8);
    if row_bytes == 0 || height == 0 || data.len() < row_bytes.checked_mul(height)? {
        return None;
    }

    let indexed = matches!(color_space, ColorSpace::Indexed { .. });
    let max = (1u32 << bits.min(8)) - 1;
    let mut rgb = Vec::with_capacity(width * height * 3);
    let mut pixel = vec![0u8; components];

    for row in data.chunks_exact(row_bytes).take(height) {
        for x in 0..width {
            for (c, slot) in pixel.iter_mut().enumerate() {
                let raw = read_sample(row, x * components + c, bits);
                *slot = if indexed || bits == 8 || bits == 16 {
                    raw
                } else {
                    (raw as u32 * 255 / max) as u8
                };
            }
            color_space.to_rgb(&pixel, &mut rgb)?;
        }
    }
    Some(rgb)
}

/// Sample `index` of a packed row; 16-bit samples keep their high byte.
fn read_sample(row: &[u8], index: usize, bits: u32) -> u8 {
    match bits {
        8 => row[index],
        16 => row[index * 2],
        _ => {
            let bit = index * bits as usize;
            let byte = row[bit / 8];
            let shift = 8 - bits as usize - (bit % 8);
            (byte >> shift) & ((1u8 << bits) - 1)
        }
    }
}

fn is_sample_filter(name: &[u8]) -> bool {
    matches!(
        name,
        b"FlateDecode" | b"Fl" | b"LZWDecode" | b"LZW" | b"ASCIIHexDecode" | b"AHx" | b"ASCII85Decode" | b"A85"
    )
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|o| resolve(doc, o)) {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| resolve(doc, o).as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

fn is_image_mask(doc: &Document, dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"ImageMask").map(|o| resolve(doc, o)),
        Ok(Object::Boolean(true))
    )
}

fn dict_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Integer(i) if *i >= 0 => u32::try_from(*i).ok(),
        Object::Real(r) if *r >= 0.0 => Some(*r as u32),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn image_stream(dict: Dictionary, data: Vec<u8>) -> Stream {
        Stream::new(dict, data)
    }

    #[test]
    fn test_cmyk_conversion() {
        assert_eq!(cmyk_to_rgb(0, 0, 0, 0), [255, 255, 255]);
        assert_eq!(cmyk_to_rgb(0, 0, 0, 255), [0, 0, 0]);
        assert_eq!(cmyk_to_rgb(255, 0, 0, 0), [0, 255, 255]);
    }

    #[test]
    fn test_read_packed_samples() {
        let row = [0b1010_0000];
        assert_eq!(read_sample(&row, 0, 1), 1);
        assert_eq!(read_sample(&row, 1, 1), 0);
        assert_eq!(read_sample(&row, 2, 1), 1);

        let row = [0xAB];
        assert_eq!(read_sample(&row, 0, 4), 0xA);
        assert_eq!(read_sample(&row, 1, 4), 0xB);
    }

    #[test]
    fn test_samples_to_rgb_gray_bits() {
        // 2x1, 1-bit: black then white
        let rgb = samples_to_rgb(&[0b0100_0000], 2, 1, 1, &ColorSpace::Gray).unwrap();
        assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_samples_to_rgb_indexed() {
        let cs = ColorSpace::Indexed {
            base: Box::new(ColorSpace::Rgb),
            lookup: vec![255, 0, 0, 0, 0, 255],
        };
        let rgb = samples_to_rgb(&[1, 0], 2, 1, 8, &cs).unwrap();
        assert_eq!(rgb, vec![0, 0, 255, 255, 0, 0]);
    }

    #[test]
    fn test_truncated_samples() {
        assert!(samples_to_rgb(&[0, 0, 0], 2, 2, 8, &ColorSpace::Rgb).is_none());
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        let data = [0u8; 16];
        assert!(samples_to_rgb(&data, u32::MAX, u32::MAX, 16, &ColorSpace::Cmyk).is_none());
        assert!(samples_to_rgb(&data, 0, 4, 8, &ColorSpace::Gray).is_none());
    }

    #[test]
    fn test_huge_declared_size_fails_the_image() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => i64::from(u32::MAX),
                "Height" => i64::from(u32::MAX),
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 16,
            },
            vec![0; 64],
        );

        let err = decode_image(&doc, &stream, "page_1_img_3").unwrap_err();
        assert!(matches!(err, Error::AssetExtractionFailed { ref label, .. } if label == "page_1_img_3"));
    }

    #[test]
    fn test_jpeg_passthrough() {
        let doc = Document::with_version("1.5");
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let stream = image_stream(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 640,
                "Height" => 480,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.clone(),
        );

        let asset = decode_image(&doc, &stream, "page_1_img_1").unwrap();
        assert_eq!(asset.format(), ImageFormat::Jpeg);
        assert_eq!(asset.bytes(), jpeg.as_slice());
        assert_eq!(asset.width(), Some(640));
        assert_eq!(asset.label(), "page_1_img_1");
    }

    #[test]
    fn test_unsupported_filter() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 100,
                "Height" => 100,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
                "Filter" => "CCITTFaxDecode",
            },
            vec![0; 16],
        );

        let err = decode_image(&doc, &stream, "page_2_img_1").unwrap_err();
        assert!(matches!(err, Error::AssetExtractionFailed { ref label, .. } if label == "page_2_img_1"));
        assert!(err.to_string().contains("CCITTFaxDecode"));
    }

    #[cfg(feature = "raster")]
    #[test]
    fn test_raw_rgb_becomes_png() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        );

        let asset = decode_image(&doc, &stream, "page_1_img_1").unwrap();
        assert_eq!(asset.format(), ImageFormat::Png);
        assert_eq!(ImageFormat::sniff(asset.bytes()), Some(ImageFormat::Png));
        assert_eq!((asset.width(), asset.height()), (Some(2), Some(2)));
    }

    #[cfg(feature = "raster")]
    #[test]
    fn test_cmyk_samples_become_png() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8,
            },
            vec![0, 0, 0, 255],
        );

        let asset = decode_image(&doc, &stream, "page_1_img_1").unwrap();
        assert_eq!(asset.format(), ImageFormat::Png);
    }
}
