//! Format parsers that build a [`Book`] from raw bytes.
//!
//! Every parser implements [`Importer`]. Parsers are stateless: one call
//! consumes one input buffer and yields one book. Structural problems
//! (no container, empty spine, nothing to read) are errors; a single
//! missing or unreadable asset is logged and skipped.

mod cbz;
mod epub;
mod fb2;
mod html;
mod htmlz;
mod opf;
mod pdf;
mod txt;
mod txtz;
pub(crate) mod xml;

pub use cbz::CbzImporter;
pub use epub::EpubImporter;
pub use fb2::Fb2Importer;
pub use html::HtmlImporter;
pub use htmlz::HtmlzImporter;
pub use opf::{NavLabel, Package, parse_container, parse_ncx, parse_opf};
pub use pdf::PdfImporter;
pub use txt::{TxtImporter, text_to_html};
pub use txtz::TxtzImporter;

use tracing::{debug, warn};

use crate::archive::Archive;
use crate::book::Book;
use crate::dom::{Dom, escape_attr};
use crate::error::Result;
use crate::href;
use crate::util;

/// Progress sink invoked inline while a parser works.
///
/// The value's scale depends on the parser: EPUB reports a fraction in
/// `[0, 1]`, PDF an integer percentage in `[0, 100]`.
pub type Progress<'a> = Option<&'a mut dyn FnMut(f32)>;

/// A parser for one source format.
pub trait Importer {
    /// Parse `data` into a book.
    fn import(&self, data: &[u8], progress: Progress<'_>) -> Result<Book>;
}

/// Chapter markup for a single full-page image.
pub(crate) fn image_page_html(src: &str) -> String {
    format!(
        r#"<div style="text-align:center"><img src="{}" alt="" style="max-width:100%"/></div>"#,
        escape_attr(src)
    )
}

/// Point every local `<img src>` at its basename, so it names an image key.
pub(crate) fn relink_images_to_basename(dom: &mut Dom) {
    dom.rewrite_attr("img", "src", |src| {
        (!href::is_external(src)).then(|| href::basename(src).to_string())
    });
}

/// Add every raster image in the archive to `book`, keyed by basename.
pub(crate) fn add_archive_images(archive: &mut Archive<'_>, book: &mut Book) {
    for name in archive.names() {
        if !util::is_raster_image_path(&name) || name.starts_with("__MACOSX/") {
            continue;
        }
        match archive.read(&name) {
            Ok(data) => {
                let mime = util::detect_media_format(&name, &data).mime_type();
                book.add_image(href::basename(&name), mime, data);
            }
            Err(e) => warn!(entry = %name, error = %e, "skipping unreadable image"),
        }
    }
}

/// Title, author and language from a Calibre-style `metadata.opf`, if present.
pub(crate) fn apply_calibre_metadata(archive: &mut Archive<'_>, book: &mut Book) {
    let Some(name) = archive.find(|n| href::basename(n).eq_ignore_ascii_case("metadata.opf"))
    else {
        return;
    };

    let package = archive
        .read_string(&name)
        .and_then(|content| parse_opf(&content));
    match package {
        Ok(package) => {
            debug!(entry = %name, "applying package metadata");
            book.set_metadata(package.title, package.author);
            if package.language.is_some() {
                book.language = package.language;
            }
        }
        Err(e) => warn!(entry = %name, error = %e, "ignoring unreadable metadata"),
    }
}

/// Invoke the progress sink, if any.
pub(crate) fn report(progress: &mut Progress<'_>, value: f32) {
    if let Some(callback) = progress.as_mut() {
        callback(value);
    }
}
