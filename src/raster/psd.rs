//! Photoshop decoder for the flattened composite image (8-bit RGB or
//! grayscale, raw or PackBits).

use super::{DecodedImage, be_u16, be_u32, check_dimensions};
use crate::error::{Error, Result};

const SIGNATURE: &[u8] = b"8BPS";
const HEADER_LEN: usize = 26;

const MODE_GRAYSCALE: u16 = 1;
const MODE_RGB: u16 = 3;

pub(super) fn decode(data: &[u8]) -> Result<DecodedImage> {
    if !data.starts_with(SIGNATURE) {
        return Err(Error::InvalidImage("missing 8BPS signature".into()));
    }
    let version = be_u16(data, 4)?;
    if version != 1 {
        return Err(Error::InvalidImage(format!("unsupported PSD version {version}")));
    }

    let channels = be_u16(data, 12)? as usize;
    let height = be_u32(data, 14)?;
    let width = be_u32(data, 18)?;
    let depth = be_u16(data, 22)?;
    let mode = be_u16(data, 24)?;

    if depth != 8 {
        return Err(Error::InvalidImage(format!("unsupported bit depth {depth}")));
    }
    let color_channels = match mode {
        MODE_GRAYSCALE => 1,
        MODE_RGB => 3,
        other => return Err(Error::InvalidImage(format!("unsupported color mode {other}"))),
    };
    if channels < color_channels {
        return Err(Error::InvalidImage(format!("{channels} channels for color mode {mode}")));
    }
    let pixels = check_dimensions(width, height)?;

    // Skip color mode data, image resources, then layer and mask info.
    let mut pos = HEADER_LEN;
    for _ in 0..3 {
        let len = be_u32(data, pos)? as usize;
        pos = pos.saturating_add(4).saturating_add(len);
    }

    let compression = be_u16(data, pos)?;
    let body = data.get(pos + 2..).unwrap_or_default();
    let rows = channels * height as usize;
    let planes = match compression {
        0 => body
            .get(..pixels * channels)
            .ok_or_else(|| Error::InvalidImage("image data is truncated".into()))?
            .to_vec(),
        1 => unpack_rows(body, rows, width as usize)?,
        other => return Err(Error::InvalidImage(format!("unsupported compression {other}"))),
    };
    tracing::debug!(width, height, channels, compression, "decoded PSD composite");

    let plane = |c: usize| &planes[c * pixels..(c + 1) * pixels];
    let has_alpha = channels > color_channels;
    let mut rgba = Vec::with_capacity(pixels * 4);
    for i in 0..pixels {
        let alpha = if has_alpha { plane(color_channels)[i] } else { 255 };
        if color_channels == 3 {
            rgba.extend_from_slice(&[plane(0)[i], plane(1)[i], plane(2)[i], alpha]);
        } else {
            let v = plane(0)[i];
            rgba.extend_from_slice(&[v, v, v, alpha]);
        }
    }

    Ok(DecodedImage {
        width,
        height,
        rgba,
    })
}

/// Decode PackBits-compressed scanlines: a table of `rows` big-endian
/// byte counts followed by each row's packed data. Every row must decode
/// to exactly `width` bytes, so the output only grows with the input.
fn unpack_rows(body: &[u8], rows: usize, width: usize) -> Result<Vec<u8>> {
    let mut offset = rows
        .checked_mul(2)
        .filter(|&table| table <= body.len())
        .ok_or_else(|| Error::InvalidImage("RLE row table is truncated".into()))?;
    let mut out = Vec::new();
    for row in 0..rows {
        let len = be_u16(body, row * 2)? as usize;
        let packed = body
            .get(offset..offset + len)
            .ok_or_else(|| Error::InvalidImage("RLE row is truncated".into()))?;
        let start = out.len();
        unpack_bits(packed, &mut out);
        let decoded = out.len() - start;
        if decoded != width {
            return Err(Error::InvalidImage(format!(
                "RLE row {row} decodes to {decoded} bytes, expected {width}"
            )));
        }
        offset += len;
    }
    Ok(out)
}

fn unpack_bits(input: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < input.len() {
        let n = input[i] as i8;
        i += 1;
        match n {
            0..=127 => {
                let count = n as usize + 1;
                let end = (i + count).min(input.len());
                out.extend_from_slice(&input[i..end]);
                i = end;
            }
            -127..=-1 => {
                if let Some(&b) = input.get(i) {
                    out.extend(std::iter::repeat_n(b, (1 - n as isize) as usize));
                    i += 1;
                }
            }
            -128 => {}
        }
    }
}
