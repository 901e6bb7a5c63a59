//! EPUB 2 exporter.
//!
//! Writes `mimetype` (stored, first), `META-INF/container.xml`, one
//! `OEBPS/chap-NNNN.xhtml` per chapter, images under `OEBPS/media/`, an
//! OPF 2.0 package and an NCX table of contents.

use std::io::{Seek, Write};

use tracing::debug;
use uuid::Uuid;

use super::{Exporter, chapter_label};
use crate::archive::ArchiveWriter;
use crate::book::Book;
use crate::dom::parse_html;
use crate::error::Result;
use crate::util::escape_xml;

/// Configuration for EPUB export.
#[derive(Debug, Clone, Default)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
}

/// EPUB format exporter.
pub struct EpubExporter {
    config: EpubConfig,
}

impl EpubExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self {
            config: EpubConfig::default(),
        }
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: EpubConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for EpubExporter {
    fn default() -> Self {
        Self::new()
    }
}

const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A packaged image: manifest id, archive-relative href, media type.
struct MediaEntry<'a> {
    id: String,
    href: String,
    mime: &'a str,
    data: &'a [u8],
}

impl Exporter for EpubExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let level = self.config.compression_level.unwrap_or(6).min(9);
        let mut zip = ArchiveWriter::new(writer, Some(i64::from(level)));

        zip.add_stored("mimetype", b"application/epub+zip")?;
        zip.add("META-INF/container.xml", CONTAINER_XML)?;

        let identifier = format!("urn:uuid:{}", Uuid::new_v4());
        let media = media_entries(book);

        for (i, chapter) in book.chapters.iter().enumerate() {
            let xhtml = chapter_document(book, &chapter_label(i, chapter), &chapter.html);
            zip.add(&format!("OEBPS/{}", chapter_href(i)), xhtml.as_bytes())?;
        }

        for entry in &media {
            zip.add(&format!("OEBPS/{}", entry.href), entry.data)?;
        }

        zip.add("OEBPS/content.opf", generate_opf(book, &identifier, &media).as_bytes())?;
        zip.add("OEBPS/toc.ncx", generate_ncx(book, &identifier).as_bytes())?;

        zip.finish()?;
        debug!(
            chapters = book.chapters.len(),
            images = media.len(),
            "wrote EPUB"
        );
        Ok(())
    }
}

fn chapter_href(index: usize) -> String {
    format!("chap-{:04}.xhtml", index + 1)
}

/// Images in key order, so output is stable for a given book.
fn media_entries(book: &Book) -> Vec<MediaEntry<'_>> {
    let mut keys: Vec<&String> = book.images.keys().collect();
    keys.sort();
    keys.into_iter()
        .enumerate()
        .map(|(i, key)| {
            let image = &book.images[key];
            MediaEntry {
                id: format!("img-{}", i + 1),
                href: format!("media/{key}"),
                mime: &image.mime,
                data: &image.data,
            }
        })
        .collect()
}

/// Wrap a chapter body in a complete XHTML document.
///
/// The body is re-serialized through the DOM so the result is well-formed
/// XML. Scripts and styles are dropped, image references that name a book
/// image point into `media/`, and images naming nothing are removed.
fn chapter_document(book: &Book, title: &str, html: &str) -> String {
    let mut dom = parse_html(html);
    dom.remove_tags(&["script", "style"]);
    let relink = |src: &str| {
        book.image(src)
            .map(|image| format!("media/{}", image.id))
            .or_else(|| src.starts_with("data:").then(|| src.to_string()))
    };
    dom.relink_or_remove("img", "src", relink);
    dom.relink_or_remove("image", "href", relink);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>{}</title>
  <meta http-equiv="Content-Type" content="application/xhtml+xml; charset=utf-8"/>
</head>
<body>
{}
</body>
</html>
"#,
        escape_xml(title),
        dom.body_inner_html()
    )
}

fn generate_opf(book: &Book, identifier: &str, media: &[MediaEntry<'_>]) -> String {
    let mut opf = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(book.display_title())
    ));
    if let Some(author) = &book.author {
        opf.push_str(&format!(
            "    <dc:creator opf:role=\"aut\">{}</dc:creator>\n",
            escape_xml(author)
        ));
    }
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(book.language.as_deref().unwrap_or("en"))
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));
    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );

    for i in 0..book.chapters.len() {
        opf.push_str(&format!(
            "    <item id=\"chap-{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            i + 1,
            chapter_href(i)
        ));
    }
    for entry in media {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
            entry.id,
            escape_xml(&entry.href),
            escape_xml(entry.mime)
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    for i in 0..book.chapters.len() {
        opf.push_str(&format!("    <itemref idref=\"chap-{}\"/>\n", i + 1));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_ncx(book: &Book, identifier: &str) -> String {
    let mut ncx = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    ncx.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape_xml(identifier)
    ));
    ncx.push_str(
        r#"    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
"#,
    );
    ncx.push_str(&format!(
        "  <docTitle><text>{}</text></docTitle>\n  <navMap>\n",
        escape_xml(book.display_title())
    ));

    for (i, chapter) in book.chapters.iter().enumerate() {
        ncx.push_str(&format!(
            "    <navPoint id=\"navPoint-{n}\" playOrder=\"{n}\">\n      <navLabel><text>{}</text></navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n",
            escape_xml(&chapter_label(i, chapter)),
            chapter_href(i),
            n = i + 1,
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;
    use crate::import::{EpubImporter, Importer, parse_ncx, parse_opf};
    use std::io::Cursor;
    use zip::{CompressionMethod, ZipArchive};

    fn sample_book() -> Book {
        let mut book = Book::new().with_title("Tales & Stories").with_author("A. Writer");
        book.add_chapter(Some("Opening".into()), r#"<p>Once <b>upon</b> a time.<br>New line</p><img src="pic.png">"#);
        book.add_chapter(None, r#"<p>Second.</p><img src="missing.png">"#);
        book.add_image("pic.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        book
    }

    fn export(book: &Book) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        EpubExporter::new().export(book, &mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_mimetype_first_and_stored() {
        let data = export(&sample_book());
        let mut zip = ZipArchive::new(Cursor::new(&data[..])).unwrap();
        let first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn test_package_layout() {
        let data = export(&sample_book());
        let mut archive = Archive::new(&data).unwrap();

        for name in [
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/toc.ncx",
            "OEBPS/chap-0001.xhtml",
            "OEBPS/chap-0002.xhtml",
            "OEBPS/media/pic.png",
        ] {
            assert!(archive.contains(name), "missing {name}");
        }

        let opf_xml = archive.read_string("OEBPS/content.opf").unwrap();
        let start = opf_xml.find("urn:uuid:").unwrap() + "urn:uuid:".len();
        let id = Uuid::parse_str(&opf_xml[start..start + 36]).unwrap();
        assert_eq!(id.get_version_num(), 4);

        let opf = parse_opf(&opf_xml).unwrap();
        assert_eq!(opf.title.as_deref(), Some("Tales & Stories"));
        assert_eq!(opf.author.as_deref(), Some("A. Writer"));
        assert_eq!(opf.language.as_deref(), Some("en"));
        assert_eq!(opf.spine, vec!["chap-1", "chap-2"]);
        assert_eq!(opf.manifest["img-1"].media_type, "image/png");

        let ncx = parse_ncx(&archive.read_string("OEBPS/toc.ncx").unwrap()).unwrap();
        let labels: Vec<_> = ncx.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Opening", "Chapter 2"]);
    }

    #[test]
    fn test_chapter_is_well_formed_xhtml() {
        let data = export(&sample_book());
        let mut archive = Archive::new(&data).unwrap();
        let xhtml = archive.read_string("OEBPS/chap-0001.xhtml").unwrap();

        assert!(xhtml.contains(r#"<img src="media/pic.png"/>"#), "{xhtml}");
        assert!(xhtml.contains("<br/>"));

        assert_well_formed(&xhtml);

        let second = archive.read_string("OEBPS/chap-0002.xhtml").unwrap();
        assert!(!second.contains("missing.png"));
        assert!(!second.contains("<img"));
    }

    fn assert_well_formed(xhtml: &str) {
        let mut reader = quick_xml::Reader::from_str(xhtml);
        loop {
            match reader.read_event() {
                Ok(quick_xml::events::Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("not well-formed: {e}\n{xhtml}"),
            }
        }
    }

    #[test]
    fn test_scripts_and_styles_are_dropped() {
        let mut book = Book::new();
        book.add_chapter(
            None,
            "<p>a</p><script>if (1 < 2 && 3) {}</script><style>p > em { color: red }</style>",
        );
        let data = export(&book);
        let mut archive = Archive::new(&data).unwrap();
        let xhtml = archive.read_string("OEBPS/chap-0001.xhtml").unwrap();

        assert_well_formed(&xhtml);
        assert!(xhtml.contains("<p>a</p>"));
        assert!(!xhtml.contains("<script"));
        assert!(!xhtml.contains("<style"));
    }

    #[test]
    fn test_round_trip_through_importer() {
        let book = sample_book();
        let parsed = EpubImporter.import(&export(&book), None).unwrap();

        assert_eq!(parsed.chapters.len(), book.chapters.len());
        assert_eq!(parsed.title, book.title);
        assert_eq!(parsed.chapters[0].title.as_deref(), Some("Opening"));
        assert_eq!(parsed.images["pic.png"].data, book.images["pic.png"].data);
        for (a, b) in parsed.chapters.iter().zip(&book.chapters) {
            assert_eq!(
                crate::text::html_to_text(&a.html),
                crate::text::html_to_text(&b.html)
            );
        }
    }
}
