//! Windows icon/cursor decoder. The largest entry in the directory wins.

use image::ImageFormat;

use super::{DecodedImage, check_dimensions, le_u16, le_u32};
use crate::error::{Error, Result};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, Copy)]
struct DirEntry {
    width: u32,
    height: u32,
    bit_count: u16,
    size: usize,
    offset: usize,
}

impl DirEntry {
    fn parse(data: &[u8], at: usize) -> Result<Self> {
        let byte = |i: usize| {
            data.get(at + i)
                .copied()
                .ok_or_else(|| Error::InvalidImage("icon directory is truncated".into()))
        };
        // A stored dimension of 0 means 256.
        let dim = |b: u8| if b == 0 { 256 } else { u32::from(b) };
        Ok(Self {
            width: dim(byte(0)?),
            height: dim(byte(1)?),
            bit_count: le_u16(data, at + 6)?,
            size: le_u32(data, at + 8)? as usize,
            offset: le_u32(data, at + 12)? as usize,
        })
    }
}

pub(super) fn decode(data: &[u8]) -> Result<DecodedImage> {
    let reserved = le_u16(data, 0)?;
    let kind = le_u16(data, 2)?;
    if reserved != 0 || !matches!(kind, 1 | 2) {
        return Err(Error::InvalidImage("not an ICO/CUR file".into()));
    }

    let count = le_u16(data, 4)? as usize;
    let entries = (0..count)
        .map(|i| DirEntry::parse(data, 6 + 16 * i))
        .collect::<Result<Vec<_>>>()?;

    let best = entries
        .iter()
        .max_by_key(|e| (u64::from(e.width) * u64::from(e.height), e.bit_count))
        .ok_or_else(|| Error::InvalidImage("icon has no images".into()))?;
    tracing::debug!(entries = count, width = best.width, height = best.height, "decoding icon entry");

    let payload = data
        .get(best.offset..best.offset.saturating_add(best.size))
        .ok_or_else(|| Error::InvalidImage("icon entry points outside the file".into()))?;

    if payload.starts_with(PNG_SIGNATURE) {
        let rgba = image::load_from_memory_with_format(payload, ImageFormat::Png)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        return Ok(DecodedImage {
            width,
            height,
            rgba: rgba.into_raw(),
        });
    }
    decode_dib(payload)
}

/// Decode a BITMAPINFOHEADER image whose height covers both the color
/// rows and the 1-bit AND mask that follows them.
fn decode_dib(dib: &[u8]) -> Result<DecodedImage> {
    let header_size = le_u32(dib, 0)? as usize;
    let raw_width = le_u32(dib, 4)? as i32;
    let raw_height = le_u32(dib, 8)? as i32;
    let bpp = le_u16(dib, 14)?;
    let compression = le_u32(dib, 16)?;
    let colors_used = le_u32(dib, 32)? as usize;

    if compression != 0 {
        return Err(Error::InvalidImage(format!("unsupported DIB compression {compression}")));
    }
    let width = raw_width.unsigned_abs();
    let height = raw_height.unsigned_abs() / 2;
    let top_down = raw_height < 0;
    let pixels = check_dimensions(width, height)?;
    let (w, h) = (width as usize, height as usize);

    let palette_len = match bpp {
        1 | 4 | 8 if colors_used > 0 => colors_used,
        1 | 4 | 8 => 1 << bpp,
        24 | 32 => 0,
        other => return Err(Error::InvalidImage(format!("unsupported bit depth {other}"))),
    };
    let palette_start = header_size;
    let palette = dib
        .get(palette_start..palette_start + palette_len * 4)
        .ok_or_else(|| Error::InvalidImage("DIB palette is truncated".into()))?;

    let stride = (w * bpp as usize).div_ceil(32) * 4;
    let mask_stride = w.div_ceil(32) * 4;
    let color_start = palette_start + palette.len();
    let colors = dib
        .get(color_start..color_start + stride * h)
        .ok_or_else(|| Error::InvalidImage("DIB pixel data is truncated".into()))?;
    // Some encoders omit the mask for 32-bit entries.
    let mask_start = color_start + colors.len();
    let mask = dib.get(mask_start..mask_start + mask_stride * h);

    let mut rgba = vec![0u8; pixels * 4];
    let mut any_alpha = false;
    for y in 0..h {
        let src_row = if top_down { y } else { h - 1 - y };
        let row = &colors[src_row * stride..(src_row + 1) * stride];
        for x in 0..w {
            let (r, g, b, a) = match bpp {
                32 => (row[x * 4 + 2], row[x * 4 + 1], row[x * 4], row[x * 4 + 3]),
                24 => (row[x * 3 + 2], row[x * 3 + 1], row[x * 3], 255),
                _ => {
                    let bits = bpp as usize;
                    let bit = x * bits;
                    let shift = 8 - bits - bit % 8;
                    let index = ((row[bit / 8] >> shift) & ((1u16 << bits) - 1) as u8) as usize;
                    match palette.get(index * 4..index * 4 + 3) {
                        Some(c) => (c[2], c[1], c[0], 255),
                        None => (0, 0, 0, 255),
                    }
                }
            };
            if bpp == 32 && a != 0 {
                any_alpha = true;
            }
            let at = (y * w + x) * 4;
            rgba[at..at + 4].copy_from_slice(&[r, g, b, a]);
        }
    }

    // The AND mask supplies transparency unless 32-bit data carries alpha.
    if let Some(mask) = mask
        && !any_alpha
    {
        for y in 0..h {
            let src_row = if top_down { y } else { h - 1 - y };
            let row = &mask[src_row * mask_stride..(src_row + 1) * mask_stride];
            for x in 0..w {
                let transparent = (row[x / 8] >> (7 - x % 8)) & 1 == 1;
                rgba[(y * w + x) * 4 + 3] = if transparent { 0 } else { 255 };
            }
        }
    } else if bpp == 32 && !any_alpha {
        for px in rgba.chunks_exact_mut(4) {
            px[3] = 255;
        }
    }

    Ok(DecodedImage {
        width,
        height,
        rgba,
    })
}
