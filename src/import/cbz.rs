//! Comic book archive (CBZ) parser.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use super::xml::{local_name, resolve_entity, strip_bom};
use super::{Importer, Progress, image_page_html, report};
use crate::archive::Archive;
use crate::book::Book;
use crate::error::{Error, Result};
use crate::href;
use crate::util;

/// One chapter per image, in natural name order (`2.jpg` before `10.jpg`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CbzImporter;

impl Importer for CbzImporter {
    fn import(&self, data: &[u8], mut progress: Progress<'_>) -> Result<Book> {
        let mut archive = Archive::new(data)?;

        let mut pages: Vec<String> = archive
            .names()
            .into_iter()
            .filter(|name| util::is_raster_image_path(name) && !name.starts_with("__MACOSX/"))
            .collect();
        if pages.is_empty() {
            return Err(Error::EmptyArchive);
        }
        pages.sort_by(|a, b| util::natural_cmp(a, b));

        let mut book = Book::new();
        if let Some(info) = archive.find(|n| href::basename(n).eq_ignore_ascii_case("ComicInfo.xml")) {
            match archive.read(&info).and_then(|xml| parse_comic_info(&xml)) {
                Ok((title, writer)) => book.set_metadata(title, writer),
                Err(e) => warn!(error = %e, "ignoring unreadable ComicInfo.xml"),
            }
        }

        let total = pages.len();
        for (index, name) in pages.iter().enumerate() {
            match archive.read(name) {
                Ok(data) => {
                    let key = href::basename(name);
                    let mime = util::media_format_from_path(name).mime_type();
                    debug!(entry = %name, "adding page");
                    book.add_chapter(None, image_page_html(key));
                    book.add_image(key, mime, data);
                }
                Err(e) => warn!(entry = %name, error = %e, "skipping unreadable page"),
            }
            report(&mut progress, (index + 1) as f32 / total as f32);
        }

        Ok(book)
    }
}

/// `<Title>` and `<Writer>` from a ComicInfo.xml document.
fn parse_comic_info(bytes: &[u8]) -> Result<(Option<String>, Option<String>)> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let mut reader = Reader::from_str(&content);

    let mut title = None;
    let mut writer = None;
    let mut current: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref()).to_vec();
                if matches!(name.as_slice(), b"Title" | b"Writer") {
                    current = Some(name);
                    text.clear();
                }
            }
            Event::Text(e) if current.is_some() => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Event::GeneralRef(e) if current.is_some() => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    text.push_str(&resolved);
                }
            }
            Event::End(_) => {
                if let Some(name) = current.take() {
                    let value = text.trim().to_string();
                    if !value.is_empty() {
                        match name.as_slice() {
                            b"Title" => title = title.or(Some(value)),
                            _ => writer = writer.or(Some(value)),
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((title, writer))
}
