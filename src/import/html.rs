//! Standalone HTML document parser.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use super::{Importer, Progress};
use crate::book::Book;
use crate::dom::{Dom, parse_html_bytes};
use crate::error::Result;
use crate::href;
use crate::util::MediaFormat;

/// The whole document becomes one chapter. Embedded `data:` images are
/// lifted into the book as `inline-NNNN.<ext>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlImporter;

impl Importer for HtmlImporter {
    fn import(&self, data: &[u8], _progress: Progress<'_>) -> Result<Book> {
        let mut dom = parse_html_bytes(data);
        let mut book = Book::new();
        book.title = dom.title();

        extract_data_uris(&mut dom, &mut book);
        super::relink_images_to_basename(&mut dom);

        let title = book.title.clone().or_else(|| dom.first_heading());
        book.add_chapter(title, dom.body_inner_html());
        Ok(book)
    }
}

/// Move base64 `data:` image sources into `book.images`.
pub(crate) fn extract_data_uris(dom: &mut Dom, book: &mut Book) {
    let mut counter = 0usize;
    dom.rewrite_attr("img", "src", |src| {
        let (mime, data) = match decode_data_uri(src) {
            Some(decoded) => decoded,
            None if src.starts_with("data:") => {
                warn!("skipping undecodable data URI");
                return None;
            }
            None => return None,
        };

        counter += 1;
        let format = MediaFormat::from_mime(&mime);
        let key = format!("inline-{counter:04}.{}", format.extension());
        debug!(key = %key, bytes = data.len(), "extracted inline image");
        book.add_image(key.clone(), mime, data);
        Some(key)
    });
}

/// Split a base64 `data:` URI into its media type and payload.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let mime = mime.split(';').next().unwrap_or_default();
    let mime = if mime.is_empty() { "application/octet-stream" } else { mime };

    let compact: String = href::decode(payload)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let data = STANDARD.decode(compact.as_bytes()).ok()?;
    Some((mime.to_ascii_lowercase(), data))
}
