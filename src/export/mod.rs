//! Exporters that serialize a [`Book`] into a target format.
//!
//! Every exporter follows the same builder shape:
//! - `new()` creates an exporter with default configuration
//! - `with_config()` customizes it
//! - `export()` writes to any `Write + Seek` destination
//!
//! ```
//! use vellum::Book;
//! use vellum::export::{Exporter, TextExporter};
//! use std::io::Cursor;
//!
//! let mut book = Book::new();
//! book.add_chapter(None, "<p>Hello</p>");
//!
//! let mut out = Cursor::new(Vec::new());
//! TextExporter::new().export(&book, &mut out)?;
//! assert_eq!(out.into_inner(), b"Hello");
//! # Ok::<(), vellum::Error>(())
//! ```

use std::fmt;
use std::io::{Cursor, Seek, Write};
use std::str::FromStr;

use crate::book::{Book, Chapter};
use crate::error::{Error, Result};

mod docx;
mod epub;
mod html;
mod markdown;
mod pdf;
mod rtf;
mod text;

pub use docx::DocxExporter;
pub use epub::{EpubConfig, EpubExporter};
pub use html::HtmlExporter;
pub use markdown::{MarkdownConfig, MarkdownExporter, html_to_markdown};
pub use pdf::{DrawCommand, PdfConfig, PdfExporter, PdfPage, layout_book};
pub use rtf::RtfExporter;
pub use text::{TextConfig, TextExporter};

/// Trait for exporting books to a specific format.
///
/// The writer can be a `std::fs::File`, a `std::io::Cursor<Vec<u8>>`, or
/// anything else implementing `Write + Seek`.
pub trait Exporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()>;
}

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Pdf,
    Txt,
    Epub,
    Html,
    Markdown,
    Rtf,
    Docx,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 7] = [
        TargetFormat::Pdf,
        TargetFormat::Txt,
        TargetFormat::Epub,
        TargetFormat::Html,
        TargetFormat::Markdown,
        TargetFormat::Rtf,
        TargetFormat::Docx,
    ];

    /// Parse a target token (`pdf`, `txt`, `epub`, `html`, `md`, `rtf`, `docx`).
    pub fn from_token(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(TargetFormat::Pdf),
            "txt" | "text" => Ok(TargetFormat::Txt),
            "epub" => Ok(TargetFormat::Epub),
            "html" | "htm" => Ok(TargetFormat::Html),
            "md" | "markdown" => Ok(TargetFormat::Markdown),
            "rtf" => Ok(TargetFormat::Rtf),
            "docx" => Ok(TargetFormat::Docx),
            _ => Err(Error::UnsupportedTarget(token.to_string())),
        }
    }

    /// Canonical token, also used as the file extension.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Txt => "txt",
            TargetFormat::Epub => "epub",
            TargetFormat::Html => "html",
            TargetFormat::Markdown => "md",
            TargetFormat::Rtf => "rtf",
            TargetFormat::Docx => "docx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Txt => "text/plain;charset=utf-8",
            TargetFormat::Epub => "application/epub+zip",
            TargetFormat::Html => "text/html;charset=utf-8",
            TargetFormat::Markdown => "text/markdown;charset=utf-8",
            TargetFormat::Rtf => "application/rtf",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl FromStr for TargetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Per-exporter settings, bundled for callers that pick the target at runtime.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub epub: EpubConfig,
    pub pdf: PdfConfig,
    pub markdown: MarkdownConfig,
    pub text: TextConfig,
}

/// Export `book` to `target`, returning the encoded bytes.
pub fn export_to_vec(book: &Book, target: TargetFormat, options: &ExportOptions) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match target {
        TargetFormat::Pdf => PdfExporter::new()
            .with_config(options.pdf.clone())
            .export(book, &mut out)?,
        TargetFormat::Txt => TextExporter::new()
            .with_config(options.text.clone())
            .export(book, &mut out)?,
        TargetFormat::Epub => EpubExporter::new()
            .with_config(options.epub.clone())
            .export(book, &mut out)?,
        TargetFormat::Html => HtmlExporter::new().export(book, &mut out)?,
        TargetFormat::Markdown => MarkdownExporter::new()
            .with_config(options.markdown.clone())
            .export(book, &mut out)?,
        TargetFormat::Rtf => RtfExporter::new().export(book, &mut out)?,
        TargetFormat::Docx => DocxExporter::new().export(book, &mut out)?,
    }
    Ok(out.into_inner())
}

/// Navigation label for the chapter at `index` (0-based).
pub(crate) fn chapter_label(index: usize, chapter: &Chapter) -> String {
    chapter
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("Chapter {}", index + 1))
}

/// Readable text of every chapter, skipping chapters without text.
pub(crate) fn chapter_texts(book: &Book) -> Vec<String> {
    book.chapters
        .iter()
        .map(|c| crate::text::html_to_text(&c.html))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Paragraphs of the whole book (blank-line separated blocks).
pub(crate) fn paragraphs(book: &Book) -> Vec<String> {
    chapter_texts(book)
        .iter()
        .flat_map(|text| text.split("\n\n").map(str::to_string).collect::<Vec<_>>())
        .collect()
}
