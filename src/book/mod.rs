use std::collections::HashMap;

/// Intermediate representation of a document.
///
/// Format-agnostic structure every parser produces and every exporter
/// consumes. Chapters hold body fragments whose `<img src>` values are keys
/// into [`Book::images`].
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub chapters: Vec<Chapter>,
    pub images: HashMap<String, ImageAsset>,
}

/// One unit of the reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chapter {
    pub title: Option<String>,
    /// Body fragment (no surrounding `<html>`/`<body>`).
    pub html: String,
}

/// A binary image owned by a [`Book`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub id: String,
    pub mime: String,
    pub data: Vec<u8>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Append a chapter to the reading order.
    pub fn add_chapter(&mut self, title: Option<String>, html: impl Into<String>) {
        self.chapters.push(Chapter {
            title,
            html: html.into(),
        });
    }

    /// Add an image keyed by `id`. An existing image with the same key is kept.
    pub fn add_image(&mut self, id: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) {
        let id = id.into();
        self.images.entry(id.clone()).or_insert_with(|| ImageAsset {
            id,
            mime: mime.into(),
            data,
        });
    }

    /// Look up an image by the `src` value used in chapter HTML.
    ///
    /// References are matched by basename, so `media/cover.jpg` and
    /// `cover.jpg` find the same asset.
    pub fn image(&self, src: &str) -> Option<&ImageAsset> {
        self.images
            .get(src)
            .or_else(|| self.images.get(crate::href::basename(src)))
    }

    /// Patch title/author after parsing. Only fields that are `Some` are applied.
    pub fn set_metadata(&mut self, title: Option<String>, author: Option<String>) {
        if title.is_some() {
            self.title = title;
        }
        if author.is_some() {
            self.author = author;
        }
    }

    /// Title to show when none was found in the source.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

impl Chapter {
    pub fn new(title: Option<String>, html: impl Into<String>) -> Self {
        Self {
            title,
            html: html.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_lookup_by_basename() {
        let mut book = Book::new();
        book.add_image("cover.jpg", "image/jpeg", vec![1, 2, 3]);

        assert!(book.image("cover.jpg").is_some());
        assert!(book.image("media/cover.jpg").is_some());
        assert!(book.image("../images/cover.jpg").is_some());
        assert!(book.image("missing.png").is_none());
    }

    #[test]
    fn test_add_image_keeps_first() {
        let mut book = Book::new();
        book.add_image("a.png", "image/png", vec![1]);
        book.add_image("a.png", "image/png", vec![2]);
        assert_eq!(book.images["a.png"].data, vec![1]);
    }

    #[test]
    fn test_set_metadata_only_patches_some() {
        let mut book = Book::new().with_title("Old").with_author("Someone");
        book.set_metadata(Some("New".into()), None);
        assert_eq!(book.title.as_deref(), Some("New"));
        assert_eq!(book.author.as_deref(), Some("Someone"));
    }
}
