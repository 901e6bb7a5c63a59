//! FictionBook 2 parser.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use super::xml::{attr, local_name, resolve_entity, strip_bom};
use super::{Importer, Progress};
use crate::book::Book;
use crate::dom::collapse_whitespace;
use crate::error::Result;
use crate::util::{self, escape_xml};

/// One chapter per `<body>`; section titles become `<h2>`, paragraphs
/// `<p>`, and `<binary>` payloads become images.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fb2Importer;

/// Paragraph-like element being accumulated.
struct Para {
    html: String,
    plain: String,
    heading: bool,
    subtitle: bool,
}

#[derive(Default)]
struct Chapter {
    title: Option<String>,
    html: String,
}

impl Importer for Fb2Importer {
    fn import(&self, data: &[u8], _progress: Progress<'_>) -> Result<Book> {
        let content = util::decode_text(strip_bom(data), util::extract_xml_encoding(data));
        let mut reader = Reader::from_str(&content);

        let mut book = Book::new();
        let mut stack: Vec<Vec<u8>> = Vec::new();

        let mut chapter: Option<Chapter> = None;
        let mut para: Option<Para> = None;

        let mut meta_text = String::new();
        let mut author_parts: Option<Vec<String>> = None;

        let mut binary: Option<(String, String)> = None;
        let mut payload = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = local_name(e.name().as_ref()).to_vec();
                    let in_title_info = stack.iter().any(|n| n == b"title-info");

                    match name.as_slice() {
                        b"body" => chapter = Some(Chapter::default()),
                        b"p" | b"v" | b"subtitle" | b"text-author" if chapter.is_some() => {
                            para = Some(Para {
                                html: String::new(),
                                plain: String::new(),
                                heading: stack.iter().any(|n| n == b"title"),
                                subtitle: name == b"subtitle",
                            });
                        }
                        b"emphasis" => push_markup(&mut para, "<em>"),
                        b"strong" => push_markup(&mut para, "<strong>"),
                        b"author" if in_title_info && book.author.is_none() => {
                            author_parts = Some(Vec::new());
                        }
                        b"binary" => {
                            let id = attr(&e, b"id").unwrap_or_default();
                            let mime = attr(&e, b"content-type").unwrap_or_default();
                            binary = Some((id, mime));
                            payload.clear();
                        }
                        _ => {}
                    }
                    meta_text.clear();
                    stack.push(name);
                }
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"image" => {
                        if let (Some(chapter), Some(href)) = (chapter.as_mut(), attr(&e, b"href")) {
                            let key = href.trim_start_matches('#');
                            let img = format!(r#"<img src="{}" alt=""/>"#, escape_xml(key));
                            match para.as_mut() {
                                Some(p) => p.html.push_str(&img),
                                None => chapter.html.push_str(&img),
                            }
                        }
                    }
                    b"empty-line" => {
                        if let Some(chapter) = chapter.as_mut() {
                            chapter.html.push_str("<br/>");
                        }
                    }
                    _ => {}
                },
                Event::Text(e) => {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    push_text(&raw, &mut para, &mut meta_text, &mut payload, binary.is_some());
                }
                Event::CData(e) => {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    push_text(&raw, &mut para, &mut meta_text, &mut payload, binary.is_some());
                }
                Event::GeneralRef(e) => {
                    if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                        push_text(&resolved, &mut para, &mut meta_text, &mut payload, binary.is_some());
                    }
                }
                Event::End(e) => {
                    let name = local_name(e.name().as_ref()).to_vec();
                    stack.pop();
                    let in_title_info = stack.iter().any(|n| n == b"title-info");

                    match name.as_slice() {
                        b"p" | b"v" | b"subtitle" | b"text-author" => {
                            if let (Some(p), Some(chapter)) = (para.take(), chapter.as_mut()) {
                                finish_para(p, chapter);
                            }
                        }
                        b"emphasis" => push_markup(&mut para, "</em>"),
                        b"strong" => push_markup(&mut para, "</strong>"),
                        b"body" => {
                            if let Some(done) = chapter.take() {
                                debug!(title = ?done.title, "parsed FB2 body");
                                book.add_chapter(done.title, done.html);
                            }
                        }
                        b"book-title" if in_title_info => {
                            let title = collapse_whitespace(&meta_text);
                            if !title.is_empty() && book.title.is_none() {
                                book.title = Some(title);
                            }
                        }
                        b"lang" if in_title_info => {
                            let lang = meta_text.trim();
                            if !lang.is_empty() {
                                book.language = Some(lang.to_string());
                            }
                        }
                        b"first-name" | b"middle-name" | b"last-name" | b"nickname" => {
                            let part = collapse_whitespace(&meta_text);
                            if let Some(parts) = author_parts.as_mut()
                                && !part.is_empty()
                                && (name != b"nickname" || parts.is_empty())
                            {
                                parts.push(part);
                            }
                        }
                        b"author" => {
                            if let Some(parts) = author_parts.take()
                                && !parts.is_empty()
                            {
                                book.author = Some(parts.join(" "));
                            }
                        }
                        b"binary" => {
                            if let Some((id, mime)) = binary.take() {
                                add_binary(&mut book, id, mime, &payload);
                            }
                        }
                        _ => {}
                    }
                    meta_text.clear();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(book)
    }
}

fn push_text(
    raw: &str,
    para: &mut Option<Para>,
    meta_text: &mut String,
    payload: &mut String,
    in_binary: bool,
) {
    if in_binary {
        payload.push_str(raw);
    } else if let Some(p) = para.as_mut() {
        p.html.push_str(&escape_xml(raw));
        p.plain.push_str(raw);
    } else {
        meta_text.push_str(raw);
    }
}

fn push_markup(para: &mut Option<Para>, markup: &str) {
    if let Some(p) = para.as_mut() {
        p.html.push_str(markup);
    }
}

fn finish_para(p: Para, chapter: &mut Chapter) {
    let html = collapse_whitespace(&p.html);
    if html.is_empty() {
        return;
    }

    let tag = if p.heading {
        let plain = collapse_whitespace(&p.plain);
        if chapter.title.is_none() && !plain.is_empty() {
            chapter.title = Some(plain);
        }
        "h2"
    } else if p.subtitle {
        "h3"
    } else {
        "p"
    };
    chapter.html.push_str(&format!("<{tag}>{html}</{tag}>"));
}

fn add_binary(book: &mut Book, id: String, mime: String, payload: &str) {
    if id.is_empty() {
        return;
    }
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(data) => {
            let mime = if mime.is_empty() {
                util::detect_media_format(&id, &data).mime_type().to_string()
            } else {
                mime
            };
            book.add_image(id, mime, data);
        }
        Err(e) => warn!(id = %id, error = %e, "skipping undecodable binary"),
    }
}
