//! Plain text exporter.

use std::io::{Seek, Write};

use super::{Exporter, chapter_texts};
use crate::book::Book;
use crate::error::Result;

/// Configuration for plain text export.
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Inserted between chapters.
    pub chapter_separator: String,
    /// Emit `\r\n` line endings.
    pub crlf: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            chapter_separator: "\n\n".to_string(),
            crlf: false,
        }
    }
}

/// Writes each chapter's readable text, chapters separated by a blank line.
#[derive(Debug, Clone, Default)]
pub struct TextExporter {
    config: TextConfig,
}

impl TextExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: TextConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for TextExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let mut text = chapter_texts(book).join(&self.config.chapter_separator);
        if self.config.crlf {
            text = text.replace('\n', "\r\n");
        }
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}
