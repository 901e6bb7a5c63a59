//! PDF parser: every page becomes a full-page image chapter.

use tracing::{debug, warn};

use super::{Importer, Progress, image_page_html, report};
use crate::book::Book;
use crate::engine::{self, PageRenderer};
use crate::error::Result;

/// Rasterizes each page through a [`PageRenderer`] and stores it as
/// `page-NNNN.png`. Progress is an integer percentage in `[0, 100]`.
pub struct PdfImporter<'r> {
    renderer: Option<&'r dyn PageRenderer>,
    scale: f32,
}

impl PdfImporter<'static> {
    /// Use the process-wide default renderer.
    pub fn new() -> Self {
        Self {
            renderer: None,
            scale: Self::DEFAULT_SCALE,
        }
    }
}

impl Default for PdfImporter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> PdfImporter<'r> {
    pub const DEFAULT_SCALE: f32 = 2.0;

    pub fn with_renderer(renderer: &'r dyn PageRenderer) -> Self {
        Self {
            renderer: Some(renderer),
            scale: Self::DEFAULT_SCALE,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

impl Importer for PdfImporter<'_> {
    fn import(&self, data: &[u8], mut progress: Progress<'_>) -> Result<Book> {
        engine::check_pdf_header(data)?;
        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None => engine::renderer()?,
        };

        let mut book = Book::new();
        renderer.render_pages(data, self.scale, &mut |page, total, png| {
            let key = format!("page-{page:04}.png");
            debug!(page, total, bytes = png.len(), "rendered page");
            book.add_chapter(Some(format!("Page {page}")), image_page_html(&key));
            book.add_image(key, "image/png", png);
            report(&mut progress, (page * 100 / total.max(1)) as f32);
        })?;

        if book.chapters.is_empty() {
            warn!("PDF has no pages");
        }
        Ok(book)
    }
}
