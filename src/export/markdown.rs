//! Markdown exporter.
//!
//! Conversion is a fixed sequence of pattern substitutions over each
//! chapter's markup. It handles the markup our parsers produce well and
//! arbitrary HTML on a best-effort basis.

use std::borrow::Cow;
use std::io::{Seek, Write};
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::{Captures, Regex};

use super::Exporter;
use crate::book::Book;
use crate::error::Result;
use crate::import::xml::resolve_entity;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>")
        .expect("script pattern is valid")
});

pub(super) static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("img pattern is valid"));

pub(super) static SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bsrc\s*=\s*["']([^"']*)["']"#).expect("src pattern is valid")
});

static ALT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\balt\s*=\s*["']([^"']*)["']"#).expect("alt pattern is valid")
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
        .expect("link pattern is valid")
});

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-3])\b[^>]*>(.*?)</h[1-3]\s*>").expect("heading pattern is valid")
});

static LI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li\s*>").expect("li pattern is valid"));

static P_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("p pattern is valid"));

static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\b[^>]*>").expect("br pattern is valid"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

static TRAILING_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").expect("trailing space pattern is valid"));

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

/// Configuration for Markdown export.
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Inserted between chapters.
    pub chapter_separator: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            chapter_separator: "\n\n---\n\n".to_string(),
        }
    }
}

/// Exporter for Markdown output.
#[derive(Debug, Clone, Default)]
pub struct MarkdownExporter {
    config: MarkdownConfig,
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: MarkdownConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for MarkdownExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let chapters: Vec<String> = book
            .chapters
            .iter()
            .map(|chapter| {
                html_to_markdown(&chapter.html, |src| {
                    book.image(src).map(|image| {
                        format!("data:{};base64,{}", image.mime, STANDARD.encode(&image.data))
                    })
                })
            })
            .filter(|md| !md.is_empty())
            .collect();

        writer.write_all(chapters.join(&self.config.chapter_separator).as_bytes())?;
        Ok(())
    }
}

/// Convert an HTML fragment to Markdown.
///
/// `image_uri` maps an `<img src>` to the URI to emit; `None` keeps the
/// original reference.
///
/// ```
/// use vellum::export::html_to_markdown;
///
/// let md = html_to_markdown("<h2>Title</h2><p>See <a href=\"https://x.org\">this</a>.</p>", |_| None);
/// assert_eq!(md, "## Title\n\nSee [this](https://x.org).");
/// ```
pub fn html_to_markdown<F>(html: &str, image_uri: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let md = SCRIPT_RE.replace_all(html, "");

    let md = IMG_RE.replace_all(&md, |caps: &Captures<'_>| {
        let tag = &caps[0];
        let Some(src) = SRC_RE.captures(tag).map(|c| c[1].to_string()) else {
            return String::new();
        };
        let alt = ALT_RE
            .captures(tag)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let uri = image_uri(&src).unwrap_or(src);
        format!("![{alt}]({uri})")
    });

    let md = LINK_RE.replace_all(&md, "[$2]($1)");

    let md = HEADING_RE.replace_all(&md, |caps: &Captures<'_>| {
        let level = caps[1].parse::<usize>().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), caps[2].trim())
    });

    let md = LI_RE.replace_all(&md, |caps: &Captures<'_>| format!("\n- {}", caps[1].trim()));
    let md = P_RE.replace_all(&md, |caps: &Captures<'_>| format!("\n\n{}\n\n", caps[1].trim()));
    let md = BR_RE.replace_all(&md, "\n");
    let md = TAG_RE.replace_all(&md, "");
    let md = decode_entities(&md);

    let md = TRAILING_SPACE_RE.replace_all(&md, "\n");
    let md = BLANK_LINES_RE.replace_all(&md, "\n\n");
    md.trim().to_string()
}

fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(text, |caps: &Captures<'_>| {
        resolve_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_headings_and_paragraphs() {
        let md = html_to_markdown(
            "<h1>One</h1><p>First &amp; foremost.</p><h3 class=\"x\">Three</h3><p>a<br/>b</p>",
            |_| None,
        );
        assert_eq!(md, "# One\n\nFirst & foremost.\n\n### Three\n\na\nb");
    }

    #[test]
    fn test_lists() {
        let md = html_to_markdown("<ul><li>apples</li><li><em>pears</em></li></ul>", |_| None);
        assert_eq!(md, "- apples\n- pears");
    }

    #[test]
    fn test_images_use_mapped_uri() {
        let md = html_to_markdown(
            r#"<p><img src="a.png" alt="An A"/> and <img src="b.png"/></p>"#,
            |src| (src == "a.png").then(|| "data:image/png;base64,AAAA".to_string()),
        );
        assert_eq!(md, "![An A](data:image/png;base64,AAAA) and ![](b.png)");
    }

    #[test]
    fn test_strips_unknown_tags_and_scripts() {
        let md = html_to_markdown(
            "<div><span>kept</span><script>alert(1)</script></div>",
            |_| None,
        );
        assert_eq!(md, "kept");
    }

    #[test]
    fn test_chapters_joined_with_rule() {
        let mut book = Book::new();
        book.add_chapter(None, "<p>one</p>");
        book.add_chapter(None, "<p>two</p>");
        book.add_image("x.png", "image/png", vec![0]);

        let mut out = Cursor::new(Vec::new());
        MarkdownExporter::new().export(&book, &mut out).unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "one\n\n---\n\ntwo");
    }

    #[test]
    fn test_custom_separator() {
        let mut book = Book::new();
        book.add_chapter(None, "<p>one</p>");
        book.add_chapter(None, "<p>two</p>");

        let mut out = Cursor::new(Vec::new());
        MarkdownExporter::new()
            .with_config(MarkdownConfig {
                chapter_separator: "\n\n".into(),
            })
            .export(&book, &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "one\n\ntwo");
    }
}
