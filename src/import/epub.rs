//! EPUB 2/3 parser.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::opf::{parse_container, parse_ncx, parse_opf};
use super::{Importer, Progress, report};
use crate::archive::Archive;
use crate::book::Book;
use crate::dom::parse_html_bytes;
use crate::error::{Error, Result};
use crate::href;
use crate::util;

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parses EPUB containers. Progress is reported as a fraction in `[0, 1]`
/// after each spine item.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubImporter;

impl EpubImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for EpubImporter {
    fn import(&self, data: &[u8], mut progress: Progress<'_>) -> Result<Book> {
        let mut archive = Archive::new(data)?;

        if !archive.contains(CONTAINER_PATH) {
            return Err(Error::InvalidContainer(format!("missing {CONTAINER_PATH}")));
        }
        let container = archive.read(CONTAINER_PATH)?;
        let opf_path = parse_container(&container)?.ok_or_else(|| {
            Error::MissingPackage("container.xml names no rootfile full-path".into())
        })?;
        let opf = archive
            .read_string(&opf_path)
            .map_err(|e| Error::MissingPackage(format!("{opf_path}: {e}")))?;
        let package = parse_opf(&opf)?;

        if package.spine.is_empty() {
            return Err(Error::EmptySpine);
        }

        let nav_titles = load_nav_titles(&mut archive, &opf_path, package.ncx_href());

        let mut book = Book::new();
        book.title = package.title.clone();
        book.author = package.author.clone();
        book.language = package.language.clone();

        let mut wanted: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let total = package.spine.len();

        for (index, idref) in package.spine.iter().enumerate() {
            let chapter_path = match package.manifest.get(idref) {
                Some(item) if item.media_type.to_ascii_lowercase().contains("html") => {
                    Some(href::resolve(&opf_path, &item.href))
                }
                Some(item) => {
                    debug!(idref = %idref, media_type = %item.media_type, "skipping non-HTML spine item");
                    None
                }
                None => {
                    warn!(idref = %idref, "spine item missing from manifest");
                    None
                }
            };

            if let Some(path) = chapter_path {
                match archive.read(&path) {
                    Ok(bytes) => {
                        let mut dom = parse_html_bytes(&bytes);

                        let mut relink = |src: &str| {
                            if href::is_external(src) {
                                return None;
                            }
                            let target = href::resolve(&path, src);
                            let key = href::basename(&target).to_string();
                            if seen.insert(target.clone()) {
                                wanted.push(target);
                            }
                            Some(key)
                        };
                        dom.rewrite_attr("img", "src", &mut relink);
                        dom.rewrite_attr("image", "href", &mut relink);

                        let title = nav_titles
                            .get(&path)
                            .cloned()
                            .or_else(|| dom.first_heading());
                        debug!(path = %path, title = ?title, "parsed chapter");
                        book.add_chapter(title, dom.body_inner_html());
                    }
                    Err(e) => warn!(path = %path, error = %e, "skipping unreadable chapter"),
                }
            }

            report(&mut progress, (index + 1) as f32 / total as f32);
        }

        for target in wanted {
            load_image(&mut archive, &package.manifest, &opf_path, &target, &mut book);
        }

        Ok(book)
    }
}

/// Map each chapter path to its first NCX label.
fn load_nav_titles(
    archive: &mut Archive<'_>,
    opf_path: &str,
    ncx_href: Option<&str>,
) -> HashMap<String, String> {
    let mut titles = HashMap::new();
    let Some(ncx_href) = ncx_href else {
        return titles;
    };

    let ncx_path = href::resolve(opf_path, ncx_href);
    let labels = archive
        .read_string(&ncx_path)
        .and_then(|content| parse_ncx(&content));

    match labels {
        Ok(labels) => {
            for nav in labels {
                titles
                    .entry(href::resolve(&ncx_path, &nav.src))
                    .or_insert(nav.label);
            }
        }
        Err(e) => warn!(path = %ncx_path, error = %e, "ignoring unreadable NCX"),
    }
    titles
}

/// Load one referenced image into `book`, keyed by basename.
///
/// The manifest is consulted first; a target the manifest does not list is
/// looked up directly in the archive.
fn load_image(
    archive: &mut Archive<'_>,
    manifest: &HashMap<String, href::ManifestItem>,
    opf_path: &str,
    target: &str,
    book: &mut Book,
) {
    let key = href::basename(target);
    if book.images.contains_key(key) {
        return;
    }

    let (path, mime) = match href::find_in_manifest(manifest, opf_path, target) {
        Some((_, item)) => (href::resolve(opf_path, &item.href), Some(item.media_type.clone())),
        None if archive.contains(target) || archive.contains(&href::decode(target)) => {
            (target.to_string(), None)
        }
        None => {
            debug!(href = %target, "image not found in package");
            return;
        }
    };

    match archive.read(&path) {
        Ok(data) => {
            let mime = mime
                .filter(|m| m.starts_with("image/"))
                .unwrap_or_else(|| util::detect_media_format(&path, &data).mime_type().to_string());
            book.add_image(key, mime, data);
        }
        Err(e) => warn!(path = %path, error = %e, "skipping unreadable image"),
    }
}
