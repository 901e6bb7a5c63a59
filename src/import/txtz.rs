//! TXTZ (zipped text, as written by Calibre) parser.

use tracing::debug;

use super::txt::text_to_html;
use super::{Importer, Progress, add_archive_images, apply_calibre_metadata};
use crate::archive::Archive;
use crate::book::Book;
use crate::error::{Error, Result};
use crate::util;

#[derive(Debug, Clone, Copy, Default)]
pub struct TxtzImporter;

impl Importer for TxtzImporter {
    fn import(&self, data: &[u8], _progress: Progress<'_>) -> Result<Book> {
        let mut archive = Archive::new(data)?;
        let entry = archive
            .find(|n| n.to_ascii_lowercase().ends_with(".txt"))
            .ok_or(Error::NoTextFound)?;
        debug!(entry = %entry, "reading TXTZ text");

        let bytes = archive.read(&entry)?;
        let text = util::decode_text(&bytes, None);

        let mut book = Book::new();
        book.add_chapter(None, text_to_html(&text));
        add_archive_images(&mut archive, &mut book);
        apply_calibre_metadata(&mut archive, &mut book);
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use std::io::Cursor;

    fn txtz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()), None);
        for (name, data) in entries {
            writer.add(name, data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_reads_first_txt() {
        let data = txtz(&[
            ("images/cover.jpg", b"\xFF\xD8"),
            ("index.TXT", b"Hello.\n\nWorld."),
            ("other.txt", b"ignored"),
        ]);
        let book = TxtzImporter.import(&data, None).unwrap();
        assert_eq!(book.chapters[0].html, "<p>Hello.</p>\n<p>World.</p>");
        assert_eq!(book.images["cover.jpg"].mime, "image/jpeg");
    }

    #[test]
    fn test_no_text() {
        let data = txtz(&[("index.html", b"<p/>")]);
        assert!(matches!(
            TxtzImporter.import(&data, None),
            Err(Error::NoTextFound)
        ));
    }
}
