//! PDF exporter.
//!
//! Export runs in two stages. [`layout_book`] flows chapter text and images
//! onto fixed-size pages, producing [`PdfPage`] draw commands; the exporter
//! then serializes those commands with `lopdf`, using the built-in
//! Times-Roman font and embedding images as XObjects.

use std::collections::HashMap;
use std::io::{Seek, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use tracing::{debug, warn};

use super::Exporter;
use super::markdown::{IMG_RE, SRC_RE};
use crate::book::{Book, ImageAsset};
use crate::error::{Error, Result};
use crate::layout::{FontMetrics, wrap};
use crate::text::html_to_text;
use crate::util::jpeg_info;

/// Page geometry and typography, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    /// Line advance as a multiple of `font_size`.
    pub line_height: f32,
    /// Vertical gap inserted between chapters.
    pub chapter_gap: f32,
}

impl Default for PdfConfig {
    /// US Letter, half-inch margins, 12 pt type.
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 36.0,
            font_size: 12.0,
            line_height: 1.4,
            chapter_gap: 18.0,
        }
    }
}

impl PdfConfig {
    /// A4 (595×842 pt) with the default margins and type.
    pub fn a4() -> Self {
        Self {
            page_width: 595.0,
            page_height: 842.0,
            ..Self::default()
        }
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }

    pub fn line_advance(&self) -> f32 {
        self.font_size * self.line_height
    }

    fn paragraph_gap(&self) -> f32 {
        self.font_size * 0.5
    }

    /// Check that the page leaves room for at least one line of text.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidOptions(msg));
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return invalid(format!("font size must be positive, got {}", self.font_size));
        }
        if !(self.line_height.is_finite() && self.line_height > 0.0) {
            return invalid(format!("line height must be positive, got {}", self.line_height));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return invalid(format!("margin must not be negative, got {}", self.margin));
        }
        if self.content_width() < self.font_size || self.content_height() < self.line_advance() {
            return invalid(format!(
                "margin {} leaves no content area on a {}x{} pt page",
                self.margin, self.page_width, self.page_height
            ));
        }
        Ok(())
    }
}

/// One positioned drawing operation. Coordinates use the PDF convention:
/// origin at the bottom-left corner of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// A line of text with its baseline at `y`.
    Text { x: f32, y: f32, text: String },
    /// An image with its lower-left corner at (`x`, `y`).
    Image {
        key: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Draw commands for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfPage {
    pub commands: Vec<DrawCommand>,
}

/// A chapter split at its `<img>` tags.
enum Segment {
    Text(String),
    Image(String),
}

fn segments(html: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;
    for tag in IMG_RE.find_iter(html) {
        out.push(Segment::Text(html_to_text(&html[last..tag.start()])));
        if let Some(src) = SRC_RE.captures(tag.as_str()) {
            out.push(Segment::Image(src[1].to_string()));
        }
        last = tag.end();
    }
    out.push(Segment::Text(html_to_text(&html[last..])));
    out
}

/// Tracks the vertical position while filling pages top to bottom.
struct PageFlow<'a> {
    config: &'a PdfConfig,
    done: Vec<PdfPage>,
    page: PdfPage,
    y: f32,
}

impl<'a> PageFlow<'a> {
    fn new(config: &'a PdfConfig) -> Self {
        Self {
            config,
            done: Vec::new(),
            page: PdfPage::default(),
            y: config.page_height - config.margin,
        }
    }

    fn top(&self) -> f32 {
        self.config.page_height - self.config.margin
    }

    fn at_top(&self) -> bool {
        self.y >= self.top()
    }

    /// Start a new page unless `height` still fits above the bottom margin.
    fn reserve(&mut self, height: f32) {
        if self.y - height < self.config.margin && !self.at_top() {
            self.done.push(std::mem::take(&mut self.page));
            self.y = self.top();
        }
    }

    fn skip(&mut self, gap: f32) {
        if !self.at_top() {
            self.y -= gap;
        }
    }

    fn line(&mut self, text: String) {
        let advance = self.config.line_advance();
        self.reserve(advance);
        self.page.commands.push(DrawCommand::Text {
            x: self.config.margin,
            y: self.y - self.config.font_size,
            text,
        });
        self.y -= advance;
    }

    fn image(&mut self, key: &str, (px_width, px_height): (u32, u32)) {
        if px_width == 0 || px_height == 0 {
            return;
        }
        let (w, h) = (px_width as f32, px_height as f32);
        let scale = 1.0_f32
            .min(self.config.content_width() / w)
            .min(self.config.content_height() / h);
        let (width, height) = (w * scale, h * scale);

        self.reserve(height);
        let y = self.y - height;
        self.page.commands.push(DrawCommand::Image {
            key: key.to_string(),
            x: self.config.margin + (self.config.content_width() - width) / 2.0,
            y,
            width,
            height,
        });
        self.y = y - self.config.paragraph_gap();
    }

    fn finish(mut self) -> Vec<PdfPage> {
        self.done.push(self.page);
        self.done
    }
}

/// Flow every chapter of `book` onto pages.
///
/// `image_size` returns the pixel dimensions of an embeddable image, or
/// `None` for references that cannot be drawn (they are skipped). The
/// result always has at least one page.
pub fn layout_book<F>(book: &Book, config: &PdfConfig, image_size: F) -> Vec<PdfPage>
where
    F: Fn(&str) -> Option<(u32, u32)>,
{
    let metrics = FontMetrics;
    let measure = |s: &str| metrics.width_of_text_at_size(s, config.font_size);
    let mut flow = PageFlow::new(config);

    for (index, chapter) in book.chapters.iter().enumerate() {
        if index > 0 {
            flow.skip(config.chapter_gap);
        }

        for segment in segments(&chapter.html) {
            match segment {
                Segment::Text(text) => {
                    for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
                        for source_line in paragraph.split('\n') {
                            for line in wrap(source_line, measure, config.content_width()) {
                                flow.line(line);
                            }
                        }
                        flow.skip(config.paragraph_gap());
                    }
                }
                Segment::Image(src) => match image_size(&src) {
                    Some(size) => flow.image(&src, size),
                    None => debug!(src = %src, "skipping image that cannot be embedded"),
                },
            }
        }
    }

    flow.finish()
}

/// An image converted to PDF XObject streams.
struct EmbeddedImage {
    width: u32,
    height: u32,
    xobject: Stream,
    smask: Option<Stream>,
}

/// Convert an image asset for embedding: PNG (decoded and re-encoded as
/// Flate), then JPEG (passed through as DCT). Anything else yields `None`.
fn embed_image(asset: &ImageAsset) -> Option<EmbeddedImage> {
    match embed_png(&asset.data) {
        Ok(Some(image)) => return Some(image),
        Ok(None) => {}
        Err(e) => warn!(id = %asset.id, error = %e, "cannot embed PNG"),
    }
    embed_jpeg(&asset.data)
}

fn embed_png(data: &[u8]) -> Result<Option<EmbeddedImage>> {
    if !data.starts_with(b"\x89PNG") {
        return Ok(None);
    }
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Png)?;
    let (width, height) = (decoded.width(), decoded.height());

    let rgb = decoded.to_rgb8();
    let xobject = image_stream(width, height, "DeviceRGB", deflate(rgb.as_raw())?);

    let smask = if decoded.color().has_alpha() {
        let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
        Some(image_stream(width, height, "DeviceGray", deflate(&alpha)?))
    } else {
        None
    };

    Ok(Some(EmbeddedImage {
        width,
        height,
        xobject,
        smask,
    }))
}

fn embed_jpeg(data: &[u8]) -> Option<EmbeddedImage> {
    let info = jpeg_info(data)?;
    let color_space = match info.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        _ => return None,
    };
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(info.width),
        "Height" => i64::from(info.height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    Some(EmbeddedImage {
        width: info.width,
        height: info.height,
        xobject: Stream::new(dict, data.to_vec()).with_compression(false),
        smask: None,
    })
}

fn image_stream(width: u32, height: u32, color_space: &str, compressed: Vec<u8>) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Stream::new(dict, compressed).with_compression(false)
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Encode text for a simple font with WinAnsiEncoding. Unmappable
/// characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02c6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017d}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02dc}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203a}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017e}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        })
        .collect()
}

/// Text string for the document information dictionary: literal when
/// ASCII, otherwise UTF-16BE with a byte order mark.
fn info_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Exporter for paginated PDF output.
#[derive(Debug, Clone, Default)]
pub struct PdfExporter {
    config: PdfConfig,
}

impl PdfExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PdfConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for PdfExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        self.config.validate()?;
        let mut embedded: HashMap<String, EmbeddedImage> = HashMap::new();
        for chapter in &book.chapters {
            for segment in segments(&chapter.html) {
                let Segment::Image(src) = segment else {
                    continue;
                };
                if embedded.contains_key(&src) {
                    continue;
                }
                match book.image(&src).and_then(embed_image) {
                    Some(image) => {
                        embedded.insert(src, image);
                    }
                    None => debug!(src = %src, "image missing or not PNG/JPEG"),
                }
            }
        }

        let pages = layout_book(book, &self.config, |src| {
            embedded.get(src).map(|image| (image.width, image.height))
        });

        let mut doc = self.serialize(book, &pages, embedded)?;
        doc.save_to(writer)?;
        debug!(pages = pages.len(), "wrote PDF");
        Ok(())
    }
}

impl PdfExporter {
    fn serialize(
        &self,
        book: &Book,
        pages: &[PdfPage],
        mut embedded: HashMap<String, EmbeddedImage>,
    ) -> Result<Document> {
        let config = &self.config;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => FontMetrics::BASE_FONT,
            "Encoding" => "WinAnsiEncoding",
        });

        let mut names: HashMap<String, String> = HashMap::new();
        let mut xobjects = Dictionary::new();
        let mut keys: Vec<_> = embedded.keys().cloned().collect();
        keys.sort();
        for (i, key) in keys.into_iter().enumerate() {
            let Some(mut image) = embedded.remove(&key) else {
                continue;
            };
            if let Some(smask) = image.smask.take() {
                let smask_id = doc.add_object(smask);
                image.xobject.dict.set("SMask", smask_id);
            }
            let name = format!("Im{}", i + 1);
            xobjects.set(name.as_bytes().to_vec(), doc.add_object(image.xobject));
            names.insert(key, name);
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for page in pages {
            let mut operations = Vec::new();
            for command in &page.commands {
                match command {
                    DrawCommand::Text { x, y, text } => {
                        operations.push(Operation::new("BT", vec![]));
                        operations.push(Operation::new(
                            "Tf",
                            vec!["F1".into(), config.font_size.into()],
                        ));
                        operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                        operations.push(Operation::new(
                            "Tj",
                            vec![Object::String(win_ansi(text), StringFormat::Literal)],
                        ));
                        operations.push(Operation::new("ET", vec![]));
                    }
                    DrawCommand::Image {
                        key,
                        x,
                        y,
                        width,
                        height,
                    } => {
                        let Some(name) = names.get(key) else {
                            continue;
                        };
                        operations.push(Operation::new("q", vec![]));
                        operations.push(Operation::new(
                            "cm",
                            vec![
                                (*width).into(),
                                0.into(),
                                0.into(),
                                (*height).into(),
                                (*x).into(),
                                (*y).into(),
                            ],
                        ));
                        operations.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
                        operations.push(Operation::new("Q", vec![]));
                    }
                }
            }

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    config.page_width.into(),
                    config.page_height.into(),
                ],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Title" => info_string(book.display_title()),
            "Producer" => Object::string_literal("vellum"),
        };
        if let Some(author) = &book.author {
            info.set("Author", info_string(author));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        doc.compress();
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tiny_png(width: u32, height: u32, alpha: bool) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        if alpha {
            image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 128]))
                .write_to(&mut out, ImageFormat::Png)
                .unwrap();
        } else {
            image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
                .write_to(&mut out, ImageFormat::Png)
                .unwrap();
        }
        out.into_inner()
    }

    fn long_book() -> Book {
        let paragraph = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let html: String = (0..40).map(|_| format!("<p>{paragraph}</p>")).collect();
        let mut book = Book::new().with_title("Long");
        book.add_chapter(None, html);
        book
    }

    fn export(book: &Book) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        PdfExporter::new().export(book, &mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_long_text_spans_pages() {
        let config = PdfConfig::default();
        let pages = layout_book(&long_book(), &config, |_| None);
        assert!(pages.len() > 1, "expected several pages, got {}", pages.len());

        let doc = Document::load_mem(&export(&long_book())).unwrap();
        assert_eq!(doc.get_pages().len(), pages.len());
    }

    #[test]
    fn test_nothing_below_bottom_margin() {
        let config = PdfConfig::default();
        let mut book = long_book();
        book.add_chapter(None, r#"<p>tail</p><img src="big.png"><p>after</p>"#);

        let pages = layout_book(&book, &config, |src| (src == "big.png").then_some((2000, 3000)));
        for page in &pages {
            for command in &page.commands {
                match command {
                    DrawCommand::Text { y, .. } => assert!(*y >= config.margin),
                    DrawCommand::Image { y, width, height, .. } => {
                        assert!(*y >= config.margin - 0.01);
                        assert!(*width <= config.content_width() + 0.01);
                        assert!(y + height <= config.page_height - config.margin + 0.01);
                    }
                }
            }
        }
    }

    #[test]
    fn test_lines_fit_content_width() {
        let config = PdfConfig::default();
        let metrics = FontMetrics;
        for page in layout_book(&long_book(), &config, |_| None) {
            for command in page.commands {
                if let DrawCommand::Text { text, .. } = command {
                    assert!(metrics.width_of_text_at_size(&text, config.font_size) <= config.content_width());
                }
            }
        }
    }

    #[test]
    fn test_small_image_not_upscaled_and_centered() {
        let config = PdfConfig::default();
        let mut book = Book::new();
        book.add_chapter(None, r#"<img src="a.png">"#);
        let pages = layout_book(&book, &config, |_| Some((100, 50)));

        let DrawCommand::Image { x, width, height, .. } = &pages[0].commands[0] else {
            panic!("expected image");
        };
        assert_eq!((*width, *height), (100.0, 50.0));
        assert_eq!(*x, config.margin + (config.content_width() - 100.0) / 2.0);
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let mut book = Book::new();
        book.add_chapter(None, r#"<p>before</p><img src="nowhere.png"><p>after</p>"#);
        book.add_image("junk.png", "image/png", b"not an image".to_vec());
        book.add_chapter(None, r#"<img src="junk.png">"#);

        let data = export(&book);
        let doc = Document::load_mem(&data).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_embeds_png_and_jpeg() {
        let mut book = Book::new();
        book.add_image("rgb.png", "image/png", tiny_png(4, 3, false));
        book.add_image("rgba.png", "image/png", tiny_png(2, 2, true));
        book.add_image(
            "photo.jpg",
            "image/jpeg",
            vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x08, 0x00, 0x10, 0x03, 0x01, 0x22, 0x00],
        );
        book.add_chapter(None, r#"<img src="rgb.png"><img src="rgba.png"><img src="photo.jpg">"#);

        let rgb = embed_image(&book.images["rgb.png"]).unwrap();
        assert_eq!((rgb.width, rgb.height), (4, 3));
        assert!(rgb.smask.is_none());
        assert!(embed_image(&book.images["rgba.png"]).unwrap().smask.is_some());
        let jpeg = embed_image(&book.images["photo.jpg"]).unwrap();
        assert_eq!((jpeg.width, jpeg.height), (16, 8));

        let doc = Document::load_mem(&export(&book)).unwrap();
        let images = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| matches!(s.dict.get(b"Subtype").and_then(|o| o.as_name()), Ok(b"Image")))
            .count();
        assert_eq!(images, 4);
    }

    #[test]
    fn test_empty_book_has_one_page() {
        let doc = Document::load_mem(&export(&Book::new())).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("A\u{e9}\u{2019}\u{4e2d}"), vec![b'A', 0xE9, 0x92, b'?']);
    }

    #[test]
    fn test_degenerate_config_rejected() {
        assert!(PdfConfig::default().validate().is_ok());
        assert!(PdfConfig { margin: 0.0, ..PdfConfig::default() }.validate().is_ok());

        for config in [
            PdfConfig { margin: -5.0, ..PdfConfig::default() },
            PdfConfig { margin: 306.0, ..PdfConfig::default() },
            PdfConfig { font_size: 0.0, ..PdfConfig::default() },
            PdfConfig { font_size: f32::NAN, ..PdfConfig::default() },
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidOptions(_))), "{config:?}");
            let mut out = Cursor::new(Vec::new());
            let exporter = PdfExporter::new().with_config(config);
            assert!(exporter.export(&long_book(), &mut out).is_err());
            assert!(out.into_inner().is_empty());
        }
    }
}
