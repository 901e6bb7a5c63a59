//! Byte and text helpers shared by the importers and exporters.

use std::borrow::Cow;
use std::cmp::Ordering;

use memchr::memmem;

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 (a BOM is handled by encoding_rs)
/// 2. The hint encoding, e.g. from `<?xml encoding="..."?>`
/// 3. Windows-1252, common in older ebooks
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the encoding name from an XML declaration in the first 100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];

    let xml_start = memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

// ============================================================================
// Image Format Detection
// ============================================================================

/// Raster/vector image formats that can appear inside documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Svg,
    Binary,
}

impl MediaFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Bmp => "image/bmp",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::Binary => "application/octet-stream",
        }
    }

    /// File extension (without the dot) used when synthesizing names.
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Gif => "gif",
            MediaFormat::WebP => "webp",
            MediaFormat::Bmp => "bmp",
            MediaFormat::Svg => "svg",
            MediaFormat::Binary => "bin",
        }
    }

    pub fn from_mime(mime: &str) -> MediaFormat {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => MediaFormat::Jpeg,
            "image/png" => MediaFormat::Png,
            "image/gif" => MediaFormat::Gif,
            "image/webp" => MediaFormat::WebP,
            "image/bmp" => MediaFormat::Bmp,
            "image/svg+xml" => MediaFormat::Svg,
            _ => MediaFormat::Binary,
        }
    }
}

/// Detect format from the file extension only.
pub fn media_format_from_path(path: &str) -> MediaFormat {
    let ext = path
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => MediaFormat::Jpeg,
        "png" => MediaFormat::Png,
        "gif" => MediaFormat::Gif,
        "webp" => MediaFormat::WebP,
        "bmp" => MediaFormat::Bmp,
        "svg" => MediaFormat::Svg,
        _ => MediaFormat::Binary,
    }
}

/// Detect format from path, falling back to magic bytes.
pub fn detect_media_format(path: &str, data: &[u8]) -> MediaFormat {
    let by_ext = media_format_from_path(path);
    if by_ext != MediaFormat::Binary {
        return by_ext;
    }

    if data.starts_with(&[0xFF, 0xD8]) {
        MediaFormat::Jpeg
    } else if data.starts_with(b"\x89PNG") {
        MediaFormat::Png
    } else if data.starts_with(b"GIF") {
        MediaFormat::Gif
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        MediaFormat::WebP
    } else if data.starts_with(b"BM") {
        MediaFormat::Bmp
    } else {
        MediaFormat::Binary
    }
}

/// Whether an archive entry name looks like a raster image.
pub fn is_raster_image_path(path: &str) -> bool {
    matches!(
        media_format_from_path(path),
        MediaFormat::Jpeg | MediaFormat::Png | MediaFormat::Gif | MediaFormat::WebP | MediaFormat::Bmp
    )
}

/// Header facts about a baseline/progressive JPEG needed to embed it as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

/// Parse SOF markers for JPEG dimensions and component count.
pub fn jpeg_info(data: &[u8]) -> Option<JpegInfo> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        if matches!(
            marker,
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE | 0xCF
        ) && i + 9 < data.len()
        {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some(JpegInfo {
                width,
                height,
                components: data[i + 9],
            });
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + length;
    }
    None
}

// ============================================================================
// Text Helpers
// ============================================================================

/// Escape text for XML element content and attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Compare names so embedded numbers sort by value (`img2` < `img10`).
///
/// Non-digit runs compare case-insensitively; equal-valued numbers with
/// different zero padding fall back to the plain string order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let na = take_digits(&mut ai);
                let nb = take_digits(&mut bi);
                let ta = na.trim_start_matches('0');
                let tb = nb.trim_start_matches('0');
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                let ord = ca.to_lowercase().cmp(cb.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&c) = it.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        it.next();
    }
    digits
}

/// File name without directory or extension.
pub fn file_stem(filename: &str) -> &str {
    let base = crate::href::basename(filename);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(pos) => &base[..pos],
    }
}

// ============================================================================
// Tests
// ============================================================================
