//! Format routing: pick a parser from the input file name and an exporter
//! from the requested target.
//!
//! ```
//! use vellum::convert::{ExportOptions, TargetFormat, convert};
//!
//! let out = convert(b"Hello.\n\nWorld.", "note.txt", TargetFormat::Markdown, &ExportOptions::default())?;
//! assert_eq!(out.mime, "text/markdown;charset=utf-8");
//! assert_eq!(out.bytes, b"Hello.\n\nWorld.");
//! # Ok::<(), vellum::Error>(())
//! ```

use std::fmt;

use tracing::info;

use crate::book::Book;
use crate::error::{Error, Result};
use crate::import::{
    CbzImporter, EpubImporter, Fb2Importer, HtmlImporter, HtmlzImporter, Importer, PdfImporter,
    Progress, TxtImporter, TxtzImporter,
};
use crate::util::file_stem;

pub use crate::export::{ExportOptions, TargetFormat};

/// Source formats the router can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Epub,
    Pdf,
    Cbz,
    Fb2,
    Html,
    Htmlz,
    Txt,
    Txtz,
}

impl SourceKind {
    pub const ALL: [SourceKind; 8] = [
        SourceKind::Epub,
        SourceKind::Pdf,
        SourceKind::Cbz,
        SourceKind::Fb2,
        SourceKind::Html,
        SourceKind::Htmlz,
        SourceKind::Txt,
        SourceKind::Txtz,
    ];

    /// Extensions (lowercase, without the dot) that select this kind.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            SourceKind::Epub => &["epub"],
            SourceKind::Pdf => &["pdf"],
            SourceKind::Cbz => &["cbz"],
            SourceKind::Fb2 => &["fb2"],
            SourceKind::Html => &["html", "htm"],
            SourceKind::Htmlz => &["htmlz"],
            SourceKind::Txt => &["txt"],
            SourceKind::Txtz => &["txtz"],
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extensions()[0])
    }
}

/// Encoded output and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Detect the source format from a file name's extension (case-insensitive).
pub fn sniff_source(filename: &str) -> Result<SourceKind> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    SourceKind::ALL
        .into_iter()
        .find(|kind| kind.extensions().contains(&ext.as_str()))
        .ok_or_else(|| Error::UnsupportedInput(filename.to_string()))
}

/// Parse `bytes` with the parser selected by `filename`.
///
/// A book left without a title after parsing takes the file name's stem.
pub fn parse_any_to_model(bytes: &[u8], filename: &str, progress: Progress<'_>) -> Result<Book> {
    let kind = sniff_source(filename)?;
    let mut book = match kind {
        SourceKind::Epub => EpubImporter.import(bytes, progress)?,
        SourceKind::Pdf => PdfImporter::new().import(bytes, progress)?,
        SourceKind::Cbz => CbzImporter.import(bytes, progress)?,
        SourceKind::Fb2 => Fb2Importer.import(bytes, progress)?,
        SourceKind::Html => HtmlImporter.import(bytes, progress)?,
        SourceKind::Htmlz => HtmlzImporter.import(bytes, progress)?,
        SourceKind::Txt => TxtImporter.import(bytes, progress)?,
        SourceKind::Txtz => TxtzImporter.import(bytes, progress)?,
    };

    if book.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        let stem = file_stem(filename);
        if !stem.is_empty() {
            book.title = Some(stem.to_string());
        }
    }

    info!(
        filename,
        source = %kind,
        chapters = book.chapters.len(),
        images = book.images.len(),
        "parsed input"
    );
    Ok(book)
}

/// Serialize `book` as `target`.
pub fn export_model(book: &Book, target: TargetFormat, options: &ExportOptions) -> Result<Output> {
    let bytes = crate::export::export_to_vec(book, target, options)?;
    info!(target_format = %target, bytes = bytes.len(), "exported book");
    Ok(Output {
        bytes,
        mime: target.mime_type(),
    })
}

/// Parse and export in one call.
pub fn convert(
    bytes: &[u8],
    filename: &str,
    target: TargetFormat,
    options: &ExportOptions,
) -> Result<Output> {
    let book = parse_any_to_model(bytes, filename, None)?;
    export_model(&book, target, options)
}
