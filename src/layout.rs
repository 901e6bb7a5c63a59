//! Greedy word wrapping against a measured width.

/// Break `text` into lines no wider than `max_width`.
///
/// Tokens are whitespace-separated words. A word wider than `max_width` on
/// its own is split character by character; a single character that still
/// does not fit becomes its own line.
///
/// ```
/// use vellum::layout::wrap;
///
/// let width = |s: &str| s.chars().count() as f32;
/// assert_eq!(wrap("aa bb cc", width, 5.0), vec!["aa bb", "cc"]);
/// assert_eq!(wrap("abcdefg", width, 3.0), vec!["abc", "def", "g"]);
/// ```
pub fn wrap<F>(text: &str, width_of: F, max_width: f32) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for token in text.split_whitespace() {
        if current.is_empty() {
            if width_of(token) <= max_width {
                current.push_str(token);
            } else {
                break_token(token, &width_of, max_width, &mut lines);
            }
            continue;
        }

        let candidate = format!("{current} {token}");
        if width_of(&candidate) <= max_width {
            current = candidate;
        } else if width_of(token) <= max_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(token);
        } else {
            lines.push(std::mem::take(&mut current));
            break_token(token, &width_of, max_width, &mut lines);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split an oversized token into chunks that fit, each on its own line.
fn break_token<F>(token: &str, width_of: &F, max_width: f32, lines: &mut Vec<String>)
where
    F: Fn(&str) -> f32,
{
    let mut chunk = String::new();
    for c in token.chars() {
        chunk.push(c);
        if width_of(&chunk) > max_width && chunk.chars().count() > 1 {
            chunk.pop();
            lines.push(std::mem::take(&mut chunk));
            chunk.push(c);
        }
    }
    if !chunk.is_empty() {
        lines.push(chunk);
    }
}

/// Advance widths for the standard Times-Roman face, in 1/1000 em.
///
/// Covers printable ASCII (0x20..=0x7E); other characters use
/// [`FontMetrics::FALLBACK_WIDTH`].
#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // ' '..'/'
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // '0'..'?'
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // '@'..'O'
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // 'P'..'_'
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // '`'..'o'
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,      // 'p'..'~'
];

/// Font metrics for a built-in PDF font.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMetrics;

impl FontMetrics {
    /// Width used for characters outside the table.
    pub const FALLBACK_WIDTH: u16 = 500;

    /// PostScript name of the face these metrics describe.
    pub const BASE_FONT: &'static str = "Times-Roman";

    /// Width of `text` set at `size` points.
    pub fn width_of_text_at_size(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(Self::char_width(c))).sum();
        units as f32 * size / 1000.0
    }

    fn char_width(c: char) -> u16 {
        match c as u32 {
            code @ 0x20..=0x7E => TIMES_ROMAN_WIDTHS[(code - 0x20) as usize],
            0xA0 => 250,
            _ => Self::FALLBACK_WIDTH,
        }
    }
}
