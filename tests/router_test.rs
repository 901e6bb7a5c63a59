//! Routing by file name and target token.

mod common;

use vellum::convert::{ExportOptions, SourceKind, TargetFormat, convert, export_model, parse_any_to_model, sniff_source};
use vellum::raster::{self, RasterFormat};
use vellum::Error;

use common::{png_pixel, sample_epub, zip_bytes};

#[test]
fn test_sniff_every_supported_extension() {
    let cases = [
        ("a.epub", SourceKind::Epub),
        ("a.pdf", SourceKind::Pdf),
        ("a.cbz", SourceKind::Cbz),
        ("a.fb2", SourceKind::Fb2),
        ("a.html", SourceKind::Html),
        ("a.HTM", SourceKind::Html),
        ("a.htmlz", SourceKind::Htmlz),
        ("a.txt", SourceKind::Txt),
        ("a.TxTz", SourceKind::Txtz),
    ];
    for (name, kind) in cases {
        assert_eq!(sniff_source(name).unwrap(), kind, "{name}");
    }
}

#[test]
fn test_unknown_extensions_rejected() {
    for name in ["a.mobi", "a.docx", "a", "a.", "archive.zip"] {
        assert!(matches!(sniff_source(name), Err(Error::UnsupportedInput(_))), "{name}");
    }
}

#[test]
fn test_raster_names_are_not_document_sources() {
    assert!(sniff_source("icon.ico").is_err());
    assert_eq!(RasterFormat::from_filename("icon.ico"), Some(RasterFormat::Ico));
}

#[test]
fn test_unknown_target_token() {
    assert!(matches!(TargetFormat::from_token("mobi"), Err(Error::UnsupportedTarget(_))));
}

#[test]
fn test_epub_to_every_target() {
    let book = parse_any_to_model(&sample_epub(), "sample.epub", None).unwrap();
    for target in TargetFormat::ALL {
        let out = export_model(&book, target, &ExportOptions::default()).unwrap();
        assert_eq!(out.mime, target.mime_type());
        match target {
            TargetFormat::Pdf => assert!(out.bytes.starts_with(b"%PDF")),
            TargetFormat::Epub | TargetFormat::Docx => assert!(out.bytes.starts_with(b"PK")),
            TargetFormat::Rtf => assert!(out.bytes.starts_with(b"{\\rtf1")),
            TargetFormat::Html | TargetFormat::Markdown | TargetFormat::Txt => {
                let text = String::from_utf8(out.bytes).unwrap();
                assert!(text.contains("stormy night"), "{target}: {text}");
            }
        }
    }
}

#[test]
fn test_htmlz_and_txtz_sources() {
    let png = png_pixel();
    let htmlz = zip_bytes(&[
        ("index.html", br#"<html><head><title>Z</title></head><body><p>zipped <img src="images/a.png"></p></body></html>"#),
        ("images/a.png", &png),
    ]);
    let book = parse_any_to_model(&htmlz, "z.htmlz", None).unwrap();
    assert_eq!(book.title.as_deref(), Some("Z"));
    assert!(book.chapters[0].html.contains(r#"src="a.png""#));
    assert!(book.images.contains_key("a.png"));

    let txtz = zip_bytes(&[("notes/readme.TXT", b"one\n\ntwo")]);
    let out = convert(&txtz, "n.txtz", TargetFormat::Txt, &ExportOptions::default()).unwrap();
    assert_eq!(out.bytes, b"one\n\ntwo");

    let empty = zip_bytes(&[("a.png", &png)]);
    assert!(matches!(parse_any_to_model(&empty, "e.txtz", None), Err(Error::NoTextFound)));
    assert!(matches!(parse_any_to_model(&empty, "e.htmlz", None), Err(Error::NoHtmlFound)));
}

#[test]
fn test_cbz_without_images() {
    let data = zip_bytes(&[("readme.txt", b"no pictures")]);
    assert!(matches!(parse_any_to_model(&data, "c.cbz", None), Err(Error::EmptyArchive)));
}

#[test]
fn test_not_a_pdf() {
    assert!(matches!(
        parse_any_to_model(b"plain bytes", "fake.pdf", None),
        Err(Error::Render(_))
    ));
}

#[test]
fn test_raster_conversion() {
    let (png, name) = raster::convert_to_png(b"P2\n2 1\n255\n0 255\n", "g.pgm").unwrap();
    assert_eq!(name, "g.png");
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.into_raw(), vec![0, 0, 0, 255, 255, 255, 255, 255]);

    assert!(matches!(
        raster::convert_to_png(b"P9", "bad.ppm"),
        Err(Error::InvalidImage(_))
    ));
}
