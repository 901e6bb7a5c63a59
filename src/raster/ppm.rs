//! Netpbm decoder: PBM, PGM and PPM in both plain (`P1`-`P3`) and raw
//! (`P4`-`P6`) encodings.

use super::{DecodedImage, check_dimensions};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bitmap,
    Graymap,
    Pixmap,
}

impl Kind {
    fn channels(self) -> usize {
        match self {
            Kind::Bitmap | Kind::Graymap => 1,
            Kind::Pixmap => 3,
        }
    }
}

/// Walks the header: whitespace-separated tokens with `#` comments.
struct Header<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Header<'a> {
    fn skip_space(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.data.get(self.pos) {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn number(&mut self) -> Result<u32> {
        self.skip_space();
        let start = self.pos;
        while self.data.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::InvalidImage(format!("expected number at byte {start}")))
    }

    /// A single plain-PBM bit; digits need not be separated.
    fn bit(&mut self) -> Result<u32> {
        self.skip_space();
        match self.data.get(self.pos) {
            Some(b'0') => {
                self.pos += 1;
                Ok(0)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(1)
            }
            _ => Err(Error::InvalidImage(format!("expected bit at byte {}", self.pos))),
        }
    }
}

pub(super) fn decode(data: &[u8]) -> Result<DecodedImage> {
    let (kind, raw) = match data.get(..2) {
        Some(b"P1") => (Kind::Bitmap, false),
        Some(b"P2") => (Kind::Graymap, false),
        Some(b"P3") => (Kind::Pixmap, false),
        Some(b"P4") => (Kind::Bitmap, true),
        Some(b"P5") => (Kind::Graymap, true),
        Some(b"P6") => (Kind::Pixmap, true),
        _ => return Err(Error::InvalidImage("not a Netpbm file".into())),
    };

    let mut header = Header { data, pos: 2 };
    let width = header.number()?;
    let height = header.number()?;
    let pixels = check_dimensions(width, height)?;

    let maxval = if kind == Kind::Bitmap {
        1
    } else {
        header.number()?
    };
    if maxval == 0 || maxval > 65535 {
        return Err(Error::InvalidImage(format!("invalid maxval {maxval}")));
    }

    let samples = if raw {
        // Exactly one whitespace byte separates the header from raster data.
        let body = data.get(header.pos + 1..).unwrap_or_default();
        raw_samples(kind, body, width as usize, height as usize, maxval)?
    } else {
        let count = pixels * kind.channels();
        let mut samples = Vec::new();
        for _ in 0..count {
            samples.push(if kind == Kind::Bitmap {
                header.bit()?
            } else {
                header.number()?
            });
        }
        samples
    };

    let mut rgba = Vec::with_capacity(pixels * 4);
    match kind {
        Kind::Bitmap => {
            for &bit in &samples {
                let v = if bit == 1 { 0 } else { 255 };
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Kind::Graymap => {
            for &s in &samples {
                let v = scale(s, maxval);
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Kind::Pixmap => {
            for px in samples.chunks_exact(3) {
                rgba.extend_from_slice(&[
                    scale(px[0], maxval),
                    scale(px[1], maxval),
                    scale(px[2], maxval),
                    255,
                ]);
            }
        }
    }

    Ok(DecodedImage {
        width,
        height,
        rgba,
    })
}

fn raw_samples(kind: Kind, body: &[u8], width: usize, height: usize, maxval: u32) -> Result<Vec<u32>> {
    let short = || Error::InvalidImage("raster data is truncated".into());

    if kind == Kind::Bitmap {
        let stride = width.div_ceil(8);
        let rows = body.get(..stride * height).ok_or_else(short)?;
        let mut samples = Vec::with_capacity(width * height);
        for row in rows.chunks_exact(stride) {
            for x in 0..width {
                samples.push(u32::from((row[x / 8] >> (7 - x % 8)) & 1));
            }
        }
        return Ok(samples);
    }

    let count = width * height * kind.channels();
    if maxval < 256 {
        let bytes = body.get(..count).ok_or_else(short)?;
        Ok(bytes.iter().map(|&b| u32::from(b)).collect())
    } else {
        let bytes = body.get(..count * 2).ok_or_else(short)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|b| u32::from(u16::from_be_bytes([b[0], b[1]])))
            .collect())
    }
}

fn scale(sample: u32, maxval: u32) -> u8 {
    let sample = sample.min(maxval);
    ((sample * 255 + maxval / 2) / maxval) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_pixmap_with_comments() {
        let img = decode(b"P3\n# a comment\n2 1 # trailing\n255\n255 0 0  0 0 255\n").unwrap();
        assert_eq!((img.width, img.height), (2, 1));
        assert_eq!(img.rgba, vec![255, 0, 0, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn test_plain_bitmap_without_separators() {
        let img = decode(b"P1\n3 1\n101").unwrap();
        assert_eq!(img.rgba, vec![0, 0, 0, 255, 255, 255, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn test_raw_graymap_scales_maxval() {
        let img = decode(b"P5 2 1 15\n\x00\x0f").unwrap();
        assert_eq!(img.rgba, vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn test_raw_pixmap_sixteen_bit() {
        let img = decode(b"P6 1 1 65535\n\xff\xff\x80\x00\x00\x00").unwrap();
        assert_eq!(img.rgba, vec![255, 128, 0, 255]);
    }

    #[test]
    fn test_raw_bitmap_rows_are_padded() {
        // 10 pixels wide: two bytes per row.
        let img = decode(b"P4 10 1\n\x80\x40").unwrap();
        let black: Vec<usize> = img
            .rgba
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[0] == 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(black, vec![0, 9]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(decode(b"P7 1 1 255\n"), Err(Error::InvalidImage(_))));
        assert!(matches!(decode(b"P6 2 2 255\n\x00"), Err(Error::InvalidImage(_))));
        assert!(matches!(decode(b"P2 1 1 0\n0"), Err(Error::InvalidImage(_))));
        assert!(matches!(decode(b"P3 0 1 255\n"), Err(Error::InvalidImage(_))));
    }

    #[test]
    fn test_large_header_without_samples() {
        assert!(matches!(decode(b"P3 16384 16384 255\n1 2 3"), Err(Error::InvalidImage(_))));
        assert!(matches!(decode(b"P6 16384 16384 255\n\x00"), Err(Error::InvalidImage(_))));
    }
}
