//! HTMLZ (zipped HTML, as written by Calibre) parser.

use tracing::debug;

use super::html::extract_data_uris;
use super::{Importer, Progress, add_archive_images, apply_calibre_metadata};
use crate::archive::Archive;
use crate::book::Book;
use crate::dom::parse_html_bytes;
use crate::error::{Error, Result};
use crate::href;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlzImporter;

impl Importer for HtmlzImporter {
    fn import(&self, data: &[u8], _progress: Progress<'_>) -> Result<Book> {
        let mut archive = Archive::new(data)?;
        let entry = find_html_entry(&archive).ok_or(Error::NoHtmlFound)?;
        debug!(entry = %entry, "reading HTMLZ document");

        let mut dom = parse_html_bytes(&archive.read(&entry)?);
        let mut book = Book::new();
        book.title = dom.title();

        extract_data_uris(&mut dom, &mut book);
        super::relink_images_to_basename(&mut dom);
        add_archive_images(&mut archive, &mut book);
        apply_calibre_metadata(&mut archive, &mut book);

        let title = book.title.clone().or_else(|| dom.first_heading());
        book.add_chapter(title, dom.body_inner_html());
        Ok(book)
    }
}

/// `index.html`/`index.htm` first, otherwise any HTML-like entry.
fn find_html_entry(archive: &Archive<'_>) -> Option<String> {
    archive
        .find(|n| {
            let base = href::basename(n).to_ascii_lowercase();
            base == "index.html" || base == "index.htm"
        })
        .or_else(|| {
            archive.find(|n| {
                let lower = n.to_ascii_lowercase();
                lower.ends_with(".html") || lower.ends_with(".htm") || lower.ends_with(".xhtml")
            })
        })
}
