//! PDF export layout and PDF import through a page renderer.

mod common;

use std::io::Cursor;

use lopdf::Document;

use vellum::Book;
use vellum::engine::PageRenderer;
use vellum::export::{DrawCommand, Exporter, PdfConfig, PdfExporter, layout_book};
use vellum::import::{Importer, PdfImporter};

use common::png_pixel;

fn long_chapter() -> String {
    (1..=120)
        .map(|i| format!("<p>Paragraph {i} has a handful of words that wrap across the page.</p>"))
        .collect()
}

fn text_lines(pages: &[vellum::export::PdfPage]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|p| &p.commands)
        .filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.clone()),
            DrawCommand::Image { .. } => None,
        })
        .collect()
}

#[test]
fn test_overlong_chapter_spans_pages_above_margin() {
    let mut book = Book::new();
    book.add_chapter(None, long_chapter());
    let config = PdfConfig::default();

    let pages = layout_book(&book, &config, |_| None);
    assert!(pages.len() >= 2);
    for page in &pages {
        for command in &page.commands {
            if let DrawCommand::Text { y, .. } = command {
                assert!(*y >= config.margin, "baseline {y} below margin");
            }
        }
    }

    let mut out = Cursor::new(Vec::new());
    PdfExporter::new().export(&book, &mut out).unwrap();
    let data = out.into_inner();
    assert!(data.starts_with(b"%PDF"));
    assert_eq!(Document::load_mem(&data).unwrap().get_pages().len(), pages.len());
}

#[test]
fn test_missing_image_keeps_surrounding_text() {
    let mut book = Book::new();
    book.add_chapter(None, r#"<p>Before the picture.</p><img src="missing.png"><p>After the picture.</p>"#);

    let pages = layout_book(&book, &PdfConfig::default(), |_| None);
    assert_eq!(text_lines(&pages), vec!["Before the picture.", "After the picture."]);

    let mut out = Cursor::new(Vec::new());
    PdfExporter::new().export(&book, &mut out).unwrap();
    assert!(Document::load_mem(&out.into_inner()).is_ok());
}

#[test]
fn test_image_is_placed_between_text() {
    let mut book = Book::new();
    book.add_image("dot.png", "image/png", png_pixel());
    book.add_chapter(None, r#"<p>Above.</p><img src="dot.png"><p>Below.</p>"#);

    let pages = layout_book(&book, &PdfConfig::default(), |src| (src == "dot.png").then_some((1, 1)));
    let kinds: Vec<&str> = pages[0]
        .commands
        .iter()
        .map(|c| match c {
            DrawCommand::Text { .. } => "text",
            DrawCommand::Image { .. } => "image",
        })
        .collect();
    assert_eq!(kinds, vec!["text", "image", "text"]);
}

#[test]
fn test_smaller_page_produces_more_pages() {
    let mut book = Book::new();
    book.add_chapter(None, long_chapter());

    let letter = layout_book(&book, &PdfConfig::default(), |_| None);
    let small = PdfConfig {
        page_width: 300.0,
        page_height: 400.0,
        ..PdfConfig::default()
    };
    assert!(layout_book(&book, &small, |_| None).len() > letter.len());
}

#[test]
fn test_chapters_are_separated_by_gap() {
    let config = PdfConfig::default();
    let mut book = Book::new();
    book.add_chapter(None, "<p>one</p>");
    book.add_chapter(None, "<p>two</p>");

    let pages = layout_book(&book, &config, |_| None);
    let ys: Vec<f32> = pages[0]
        .commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Text { y, .. } => Some(*y),
            DrawCommand::Image { .. } => None,
        })
        .collect();
    let paragraph_gap = config.font_size * 0.5;
    let expected = config.line_advance() + paragraph_gap + config.chapter_gap;
    assert!((ys[0] - ys[1] - expected).abs() < 0.01, "{ys:?}");
}

struct StripeRenderer;

impl PageRenderer for StripeRenderer {
    fn render_pages(
        &self,
        _pdf: &[u8],
        _scale: f32,
        on_page: &mut dyn FnMut(usize, usize, Vec<u8>),
    ) -> vellum::Result<()> {
        for page in 1..=4 {
            on_page(page, 4, png_pixel());
        }
        Ok(())
    }
}

#[test]
fn test_pdf_import_with_custom_renderer() {
    let mut percentages = Vec::new();
    let mut record = |v: f32| percentages.push(v);
    let book = PdfImporter::with_renderer(&StripeRenderer)
        .import(b"%PDF-1.4\n", Some(&mut record))
        .unwrap();

    assert_eq!(book.chapters.len(), 4);
    assert_eq!(book.chapters[3].title.as_deref(), Some("Page 4"));
    assert!(book.images.contains_key("page-0001.png"));
    assert!(book.chapters[0].html.contains(r#"src="page-0001.png""#));
    assert_eq!(percentages, vec![25.0, 50.0, 75.0, 100.0]);
}
