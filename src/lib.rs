//! # vellum
//!
//! Local document and ebook conversion. Every input is parsed into a
//! format-agnostic [`Book`] and every output is serialized from one.
//!
//! ## Formats
//!
//! | Input | Output |
//! |-------|--------|
//! | EPUB, PDF (pages as images), CBZ, FB2, HTML, HTMLZ, TXT, TXTZ | EPUB, PDF, HTML, Markdown, TXT, RTF, DOCX |
//!
//! PSD, ICO/CUR and Netpbm images can be decoded and re-encoded as PNG
//! through [`raster`].
//!
//! ## Quick Start
//!
//! ```
//! use vellum::convert::{ExportOptions, TargetFormat, export_model, parse_any_to_model};
//!
//! let book = parse_any_to_model(b"First.\n\nSecond.", "notes.txt", None)?;
//! assert_eq!(book.title.as_deref(), Some("notes"));
//!
//! let out = export_model(&book, TargetFormat::Epub, &ExportOptions::default())?;
//! assert_eq!(out.mime, "application/epub+zip");
//! # Ok::<(), vellum::Error>(())
//! ```
//!
//! ## Working with Books
//!
//! Parsers and exporters can also be used directly:
//!
//! ```
//! use std::io::Cursor;
//! use vellum::Book;
//! use vellum::export::{Exporter, MarkdownExporter};
//!
//! let mut book = Book::new().with_title("Notes");
//! book.add_chapter(Some("One".into()), "<h1>One</h1><p>Body.</p>");
//!
//! let mut out = Cursor::new(Vec::new());
//! MarkdownExporter::new().export(&book, &mut out)?;
//! assert_eq!(out.into_inner(), b"# One\n\nBody.");
//! # Ok::<(), vellum::Error>(())
//! ```

pub mod archive;
pub mod book;
pub mod convert;
pub mod dom;
pub mod engine;
pub mod error;
pub mod export;
pub mod href;
pub mod import;
pub mod layout;
pub mod raster;
pub mod text;
pub(crate) mod util;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use book::{Book, Chapter, ImageAsset};
pub use convert::{Output, SourceKind, TargetFormat, convert, export_model, parse_any_to_model, sniff_source};
pub use error::{Error, Result};
