//! PDF page rendering.
//!
//! Rasterizing PDF pages is delegated to a [`PageRenderer`]. The default
//! renderer (feature `render`, backed by `hayro`) is created once per process
//! and shared by every conversion; see [`renderer`].

use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Renders pages of a PDF document to PNG bitmaps.
pub trait PageRenderer: Send + Sync {
    /// Render every page of `pdf` at `scale` (1.0 = 72 dpi), in order.
    ///
    /// `on_page` receives the 1-based page number, the page count and the
    /// encoded PNG. Any failure aborts the whole document.
    fn render_pages(
        &self,
        pdf: &[u8],
        scale: f32,
        on_page: &mut dyn FnMut(usize, usize, Vec<u8>),
    ) -> Result<()>;
}

static RENDERER: OnceLock<DefaultRenderer> = OnceLock::new();

/// The process-wide default renderer, initialized on first use.
///
/// Concurrent first callers block until the single initialization finishes.
pub fn renderer() -> Result<&'static dyn PageRenderer> {
    let renderer = RENDERER.get_or_init(DefaultRenderer::new);
    renderer.available()?;
    Ok(renderer)
}

#[cfg(feature = "render")]
pub use hayro_backend::HayroRenderer as DefaultRenderer;

#[cfg(not(feature = "render"))]
pub use unavailable::Unavailable as DefaultRenderer;

#[cfg(feature = "render")]
mod hayro_backend {
    use std::sync::Arc;

    use hayro::{InterpreterSettings, Pdf, RenderSettings, render};
    use tracing::debug;

    use super::PageRenderer;
    use crate::error::{Error, Result};

    /// Page renderer backed by the pure-Rust `hayro` rasterizer.
    pub struct HayroRenderer {
        _private: (),
    }

    impl HayroRenderer {
        pub fn new() -> Self {
            debug!("initializing hayro page renderer");
            Self { _private: () }
        }

        pub(super) fn available(&self) -> Result<()> {
            Ok(())
        }
    }

    impl Default for HayroRenderer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PageRenderer for HayroRenderer {
        fn render_pages(
            &self,
            pdf: &[u8],
            scale: f32,
            on_page: &mut dyn FnMut(usize, usize, Vec<u8>),
        ) -> Result<()> {
            let document = Pdf::new(Arc::new(pdf.to_vec()))
                .map_err(|e| Error::Render(format!("cannot open PDF: {e:?}")))?;

            let render_settings = RenderSettings {
                x_scale: scale,
                y_scale: scale,
                ..Default::default()
            };

            let interpreter_settings = InterpreterSettings::default();
            let pages = document.pages();
            let total = pages.len();
            for (index, page) in pages.iter().enumerate() {
                let pixmap = render(page, &interpreter_settings, &render_settings);
                on_page(index + 1, total, pixmap.take_png());
            }
            Ok(())
        }
    }
}

#[cfg(not(feature = "render"))]
mod unavailable {
    use super::PageRenderer;
    use crate::error::{Error, Result};

    /// Placeholder used when the crate is built without a rasterizer.
    pub struct Unavailable;

    impl Unavailable {
        pub fn new() -> Self {
            Self
        }

        pub(super) fn available(&self) -> Result<()> {
            Err(Error::Render(
                "PDF rendering requires the `render` feature".into(),
            ))
        }
    }

    impl PageRenderer for Unavailable {
        fn render_pages(
            &self,
            _pdf: &[u8],
            _scale: f32,
            _on_page: &mut dyn FnMut(usize, usize, Vec<u8>),
        ) -> Result<()> {
            self.available()
        }
    }
}

/// Reject input that is clearly not a PDF before handing it to a renderer.
pub fn check_pdf_header(pdf: &[u8]) -> Result<()> {
    let head = &pdf[..pdf.len().min(1024)];
    if memchr::memmem::find(head, b"%PDF-").is_some() {
        Ok(())
    } else {
        Err(Error::Render("missing %PDF- header".into()))
    }
}
