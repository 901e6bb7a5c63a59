//! RTF exporter (plain text paragraphs in a minimal RTF 1 shell).

use std::io::{Seek, Write};

use super::{Exporter, paragraphs};
use crate::book::Book;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct RtfExporter;

impl RtfExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for RtfExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let mut rtf = String::from(
            "{\\rtf1\\ansi\\ansicpg1252\\deff0\n{\\fonttbl{\\f0\\froman Times New Roman;}}\n",
        );

        rtf.push_str("{\\info{\\title ");
        rtf.push_str(&escape_rtf(book.display_title()));
        rtf.push('}');
        if let Some(author) = &book.author {
            rtf.push_str("{\\author ");
            rtf.push_str(&escape_rtf(author));
            rtf.push('}');
        }
        rtf.push_str("}\n\\f0\\fs24\\pard\\sa200\n");

        let body: Vec<String> = paragraphs(book)
            .iter()
            .map(|p| escape_rtf(p).replace('\n', "\\line "))
            .collect();
        rtf.push_str(&body.join("\\par\n"));
        if !body.is_empty() {
            rtf.push_str("\\par\n");
        }
        rtf.push('}');

        writer.write_all(rtf.as_bytes())?;
        Ok(())
    }
}

/// Escape control characters and encode non-ASCII as `\uN?`.
///
/// RTF `\u` takes a signed 16-bit value, so characters outside the BMP are
/// written as a surrogate pair.
fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\t' => out.push_str("\\tab "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}
