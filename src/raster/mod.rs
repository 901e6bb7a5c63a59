//! Decoders for Photoshop (PSD), Windows icons (ICO/CUR) and the Netpbm
//! family, implemented in this module. `image` is only used to decode PNG
//! icon entries and to encode the PNG output.
//!
//! Every decoder produces a [`DecodedImage`] holding straight RGBA8 pixels,
//! which can be re-encoded as PNG with [`DecodedImage::to_png`].

mod ico;
mod ppm;
mod psd;

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::{Error, Result};
use crate::util::file_stem;

/// A decoded image: `rgba` holds `width * height * 4` bytes, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let image = RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or_else(|| Error::InvalidImage("pixel buffer does not match dimensions".into()))?;
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Psd,
    Ico,
    Ppm,
}

impl RasterFormat {
    /// Detect the format from a file name's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "psd" => Some(Self::Psd),
            "ico" | "cur" => Some(Self::Ico),
            "ppm" | "pgm" | "pbm" | "pnm" => Some(Self::Ppm),
            _ => None,
        }
    }
}

pub fn decode(format: RasterFormat, data: &[u8]) -> Result<DecodedImage> {
    match format {
        RasterFormat::Psd => psd::decode(data),
        RasterFormat::Ico => ico::decode(data),
        RasterFormat::Ppm => ppm::decode(data),
    }
}

/// Decode a raster file and re-encode it as PNG.
///
/// Returns the PNG bytes and a suggested output name (`<stem>.png`).
pub fn convert_to_png(data: &[u8], filename: &str) -> Result<(Vec<u8>, String)> {
    let format = RasterFormat::from_filename(filename)
        .ok_or_else(|| Error::UnsupportedInput(filename.to_string()))?;
    let png = decode(format, data)?.to_png()?;
    tracing::info!(filename, ?format, bytes = png.len(), "converted raster image");
    Ok((png, format!("{}.png", file_stem(filename))))
}

fn truncated(what: &str) -> Error {
    Error::InvalidImage(format!("{what}: unexpected end of data"))
}

fn be_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| truncated("u16"))
}

fn be_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| truncated("u32"))
}

fn le_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| truncated("u16"))
}

fn le_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| truncated("u32"))
}

/// Reject dimensions whose pixel buffer would not fit in memory.
fn check_dimensions(width: u32, height: u32) -> Result<usize> {
    const MAX_PIXELS: u64 = 1 << 28;
    let pixels = u64::from(width) * u64::from(height);
    if width == 0 || height == 0 || pixels > MAX_PIXELS {
        return Err(Error::InvalidImage(format!("unsupported dimensions {width}x{height}")));
    }
    Ok(pixels as usize)
}
