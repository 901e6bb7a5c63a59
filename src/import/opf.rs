//! EPUB package parsing: `container.xml`, the OPF package document and the NCX.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::xml::{attr, local_name, resolve_entity, strip_bom};
use crate::error::Result;
use crate::href::ManifestItem;

/// Parsed OPF package data.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub title: Option<String>,
    /// First `dc:creator`.
    pub author: Option<String>,
    pub language: Option<String>,
    /// Manifest id → item. Hrefs are relative to the package document.
    pub manifest: HashMap<String, ManifestItem>,
    /// Spine idrefs in reading order.
    pub spine: Vec<String>,
    /// `toc` attribute of `<spine>`.
    pub toc_id: Option<String>,
}

impl Package {
    /// Href of the NCX, from the spine's `toc` attribute or the first
    /// manifest item with the NCX media type.
    pub fn ncx_href(&self) -> Option<&str> {
        self.toc_id
            .as_ref()
            .and_then(|id| self.manifest.get(id))
            .or_else(|| {
                self.manifest
                    .values()
                    .find(|item| item.media_type == "application/x-dtbncx+xml")
            })
            .map(|item| item.href.as_str())
    }
}

/// A flattened NCX entry: label text and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLabel {
    pub label: String,
    /// Target href, fragment included, relative to the NCX.
    pub src: String,
}

/// Find `rootfile/@full-path` in `META-INF/container.xml`.
pub fn parse_container(bytes: &[u8]) -> Result<Option<String>> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                return Ok(attr(&e, b"full-path").filter(|p| !p.is_empty()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Parse an OPF package document.
pub fn parse_opf(content: &str) -> Result<Package> {
    let mut reader = Reader::from_str(content);

    let mut package = Package::default();
    let mut in_metadata = false;
    let mut field: Option<&'static str> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"metadata" => in_metadata = true,
                b"title" if in_metadata => field = Some("title"),
                b"creator" if in_metadata => field = Some("creator"),
                b"language" if in_metadata => field = Some("language"),
                b"spine" => package.toc_id = attr(&e, b"toc"),
                b"item" => add_item(&mut package, &e),
                b"itemref" => add_itemref(&mut package, &e),
                _ => {}
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"item" => add_item(&mut package, &e),
                b"itemref" => add_itemref(&mut package, &e),
                b"spine" => package.toc_id = attr(&e, b"toc"),
                _ => {}
            },
            Event::Text(e) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Event::CData(e) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Event::GeneralRef(e) if field.is_some() => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"metadata" {
                    in_metadata = false;
                }
                if let Some(name) = field.take() {
                    let value = crate::dom::collapse_whitespace(&text);
                    text.clear();
                    if value.is_empty() {
                        continue;
                    }
                    let slot = match name {
                        "title" => &mut package.title,
                        "creator" => &mut package.author,
                        _ => &mut package.language,
                    };
                    if slot.is_none() {
                        *slot = Some(value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(package)
}

fn add_item(package: &mut Package, e: &quick_xml::events::BytesStart<'_>) {
    let Some(id) = attr(e, b"id").filter(|id| !id.is_empty()) else {
        return;
    };
    package.manifest.insert(
        id,
        ManifestItem {
            href: attr(e, b"href").unwrap_or_default(),
            media_type: attr(e, b"media-type").unwrap_or_default(),
        },
    );
}

fn add_itemref(package: &mut Package, e: &quick_xml::events::BytesStart<'_>) {
    if let Some(idref) = attr(e, b"idref") {
        package.spine.push(idref);
    }
}

/// Parse an NCX into a flat list of labels in document order.
///
/// Nested navPoints are flattened; a parent precedes its children.
pub fn parse_ncx(content: &str) -> Result<Vec<NavLabel>> {
    let mut reader = Reader::from_str(content);

    let mut labels = Vec::new();
    let mut stack: Vec<Option<String>> = Vec::new();
    let mut in_text = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"navPoint" => stack.push(None),
                b"text" if !stack.is_empty() => {
                    in_text = true;
                    text.clear();
                }
                b"content" => push_label(&mut labels, &stack, attr(&e, b"src")),
                _ => {}
            },
            Event::Empty(e) if local_name(e.name().as_ref()) == b"content" => {
                push_label(&mut labels, &stack, attr(&e, b"src"));
            }
            Event::Text(e) if in_text => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) if in_text => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    text.push_str(&resolved);
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" if in_text => {
                    in_text = false;
                    if let Some(slot) = stack.last_mut()
                        && slot.is_none()
                    {
                        *slot = Some(crate::dom::collapse_whitespace(&text));
                    }
                }
                b"navPoint" => {
                    stack.pop();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(labels)
}

fn push_label(labels: &mut Vec<NavLabel>, stack: &[Option<String>], src: Option<String>) {
    if let (Some(Some(label)), Some(src)) = (stack.last(), src)
        && !label.is_empty()
    {
        labels.push(NavLabel {
            label: label.clone(),
            src,
        });
    }
}
