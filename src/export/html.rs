//! Single-file HTML exporter. Images are inlined as `data:` URIs.

use std::io::{Seek, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::Exporter;
use crate::book::Book;
use crate::dom::parse_html;
use crate::error::Result;
use crate::util::escape_xml;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExporter;

impl HtmlExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for HtmlExporter {
    fn export<W: Write + Seek>(&self, book: &Book, writer: &mut W) -> Result<()> {
        let sections: Vec<String> = book
            .chapters
            .iter()
            .map(|chapter| format!("<section>\n{}\n</section>", inline_images(book, &chapter.html)))
            .collect();

        let document = format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
<meta charset="utf-8"/>
<title>{title}</title>
<style>body{{max-width:42em;margin:2em auto;padding:0 1em;line-height:1.5}}img{{max-width:100%}}</style>
</head>
<body>
{body}
</body>
</html>
"#,
            lang = escape_xml(book.language.as_deref().unwrap_or("en")),
            title = escape_xml(book.display_title()),
            body = sections.join("\n<hr/>\n"),
        );

        writer.write_all(document.as_bytes())?;
        Ok(())
    }
}

/// Replace every `<img src>` naming a book image with a base64 data URI.
/// Images that name nothing in the book are dropped.
fn inline_images(book: &Book, html: &str) -> String {
    let mut dom = parse_html(html);
    dom.relink_or_remove("img", "src", |src| {
        book.image(src)
            .map(data_uri)
            .or_else(|| src.starts_with("data:").then(|| src.to_string()))
    });
    dom.body_inner_html()
}

fn data_uri(image: &crate::book::ImageAsset) -> String {
    format!("data:{};base64,{}", image.mime, STANDARD.encode(&image.data))
}
