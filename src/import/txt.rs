//! Plain text parser.

use super::{Importer, Progress};
use crate::book::Book;
use crate::error::Result;
use crate::util::{self, escape_xml};

/// Paragraphs are separated by blank lines; the result is one chapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxtImporter;

impl Importer for TxtImporter {
    fn import(&self, data: &[u8], _progress: Progress<'_>) -> Result<Book> {
        let text = util::decode_text(data, None);
        let mut book = Book::new();
        book.add_chapter(None, text_to_html(&text));
        Ok(book)
    }
}

/// Convert plain text to paragraphs.
///
/// Runs of two or more newlines separate paragraphs; a single newline
/// inside a paragraph becomes `<br/>`.
///
/// ```
/// use vellum::import::text_to_html;
///
/// assert_eq!(
///     text_to_html("One\r\nline.\r\n\r\n\r\nTwo & more."),
///     "<p>One<br/>line.</p>\n<p>Two &amp; more.</p>"
/// );
/// ```
pub fn text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|paragraph| {
            let lines: Vec<String> = paragraph
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(escape_xml)
                .collect();
            format!("<p>{}</p>", lines.join("<br/>"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
