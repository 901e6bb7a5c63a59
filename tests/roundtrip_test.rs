//! Round trips through the book model across formats.

mod common;

use std::io::Cursor;

use vellum::convert::{ExportOptions, TargetFormat, export_model, parse_any_to_model};
use vellum::export::{EpubExporter, Exporter, HtmlExporter};
use vellum::import::{CbzImporter, EpubImporter, HtmlImporter, Importer, TxtImporter};
use vellum::text::html_to_text;
use vellum::{Book, Error};

use common::{CONTAINER, png_pixel, sample_epub, zip_bytes};

fn chapter_texts(book: &Book) -> Vec<String> {
    book.chapters.iter().map(|c| html_to_text(&c.html)).collect()
}

// ============================================================================
// EPUB
// ============================================================================

#[test]
fn test_epub_round_trip_keeps_chapters_and_text() {
    let book = EpubImporter.import(&sample_epub(), None).unwrap();
    assert_eq!(book.chapters.len(), 3);
    assert_eq!(book.title.as_deref(), Some("The Sample"));
    assert_eq!(book.author.as_deref(), Some("A. Author"));

    let mut out = Cursor::new(Vec::new());
    EpubExporter::new().export(&book, &mut out).unwrap();
    let again = EpubImporter.import(&out.into_inner(), None).unwrap();

    assert_eq!(again.chapters.len(), book.chapters.len());
    let before = chapter_texts(&book);
    let after = chapter_texts(&again);
    for (a, b) in before.iter().zip(&after) {
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }
    assert_eq!(again.title, book.title);
    assert_eq!(again.author, book.author);
    assert_eq!(again.images.len(), 1);
    assert_eq!(again.images["cover.png"].data, png_pixel());
}

#[test]
fn test_epub_chapter_titles_from_ncx_then_headings() {
    let book = EpubImporter.import(&sample_epub(), None).unwrap();
    let titles: Vec<_> = book.chapters.iter().map(|c| c.title.as_deref()).collect();
    assert_eq!(titles, vec![Some("Beginning"), Some("Middle"), Some("End")]);
    assert!(book.chapters[2].html.contains("Caf\u{e9}"));
}

#[test]
fn test_epub_images_keyed_by_basename() {
    let book = EpubImporter.import(&sample_epub(), None).unwrap();
    assert!(book.chapters[0].html.contains(r#"src="cover.png""#));
    assert_eq!(book.images["cover.png"].mime, "image/png");
}

#[test]
fn test_empty_spine_is_an_error() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata/><manifest><item id="a" href="a.xhtml" media-type="application/xhtml+xml"/></manifest>
  <spine/>
</package>"#;
    let data = zip_bytes(&[
        ("mimetype", b"application/epub+zip"),
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/a.xhtml", b"<html><body><p>a</p></body></html>"),
    ]);

    let err = EpubImporter.import(&data, None).unwrap_err();
    assert!(matches!(err, Error::EmptySpine));
    assert!(err.to_string().contains("empty spine"));
}

#[test]
fn test_epub_progress_reaches_one() {
    let mut seen = Vec::new();
    let mut record = |v: f32| seen.push(v);
    EpubImporter.import(&sample_epub(), Some(&mut record)).unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last().copied(), Some(1.0));
}

// ============================================================================
// CBZ
// ============================================================================

#[test]
fn test_cbz_natural_order() {
    let png = png_pixel();
    let data = zip_bytes(&[
        ("img10.png", &png),
        ("img2.png", &png),
        ("img1.png", &png),
        ("notes.txt", b"ignored"),
    ]);

    let book = CbzImporter.import(&data, None).unwrap();
    let order: Vec<String> = book
        .chapters
        .iter()
        .map(|c| {
            let start = c.html.find("src=\"").unwrap() + 5;
            let end = c.html[start..].find('"').unwrap() + start;
            c.html[start..end].to_string()
        })
        .collect();
    assert_eq!(order, vec!["img1.png", "img2.png", "img10.png"]);
    assert_eq!(book.images.len(), 3);
}

#[test]
fn test_cbz_to_epub_keeps_pages() {
    let png = png_pixel();
    let data = zip_bytes(&[("p1.png", &png), ("p2.png", &png)]);
    let book = parse_any_to_model(&data, "comic.cbz", None).unwrap();
    let out = export_model(&book, TargetFormat::Epub, &ExportOptions::default()).unwrap();

    let again = EpubImporter.import(&out.bytes, None).unwrap();
    assert_eq!(again.chapters.len(), 2);
    assert_eq!(again.images.len(), 2);
    assert_eq!(again.title.as_deref(), Some("comic"));
}

// ============================================================================
// TXT / HTML
// ============================================================================

#[test]
fn test_txt_round_trip() {
    let source = "Hello world.\n\nSecond paragraph.";
    let book = TxtImporter.import(source.as_bytes(), None).unwrap();
    let out = export_model(&book, TargetFormat::Txt, &ExportOptions::default()).unwrap();
    assert_eq!(String::from_utf8(out.bytes).unwrap().trim_end(), source);
}

#[test]
fn test_text_stable_through_html_export() {
    let book = EpubImporter.import(&sample_epub(), None).unwrap();

    let mut out = Cursor::new(Vec::new());
    HtmlExporter::new().export(&book, &mut out).unwrap();
    let reparsed = HtmlImporter.import(&out.into_inner(), None).unwrap();

    let direct: Vec<String> = chapter_texts(&book).into_iter().filter(|t| !t.is_empty()).collect();
    assert_eq!(chapter_texts(&reparsed).join("\n\n"), direct.join("\n\n"));
}

#[test]
fn test_html_export_inlines_images() {
    let book = EpubImporter.import(&sample_epub(), None).unwrap();
    let out = export_model(&book, TargetFormat::Html, &ExportOptions::default()).unwrap();
    let html = String::from_utf8(out.bytes).unwrap();
    assert!(html.contains("src=\"data:image/png;base64,"));
    assert!(!html.contains("cover.png"));
}

#[test]
fn test_fb2_to_markdown() {
    let fb2 = r#"<?xml version="1.0" encoding="UTF-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
  <description><title-info>
    <author><first-name>Lev</first-name><last-name>Tolstoy</last-name></author>
    <book-title>Short</book-title><lang>en</lang>
  </title-info></description>
  <body><section><title><p>Part One</p></title><p>Happy families.</p></section></body>
</FictionBook>"#;

    let book = parse_any_to_model(fb2.as_bytes(), "short.fb2", None).unwrap();
    assert_eq!(book.title.as_deref(), Some("Short"));
    assert_eq!(book.author.as_deref(), Some("Lev Tolstoy"));

    let out = export_model(&book, TargetFormat::Markdown, &ExportOptions::default()).unwrap();
    assert_eq!(String::from_utf8(out.bytes).unwrap(), "## Part One\n\nHappy families.");
}
