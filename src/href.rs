//! Href resolution for archive-relative references.
//!
//! All paths here are archive paths (forward slashes, no drive letters), so
//! this deliberately avoids `std::path`.

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// A manifest entry as found in an OPF `<manifest>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
}

/// Resolve `relative` against the directory containing `base`.
///
/// Fragments and query strings are stripped from `relative` first, since
/// they never name an archive entry.
///
/// ```
/// use vellum::href::resolve;
///
/// assert_eq!(resolve("OEBPS/text/ch1.xhtml", "../images/a.png"), "OEBPS/images/a.png");
/// assert_eq!(resolve("ch1.xhtml", "a.png#frag"), "a.png");
/// ```
pub fn resolve(base: &str, relative: &str) -> String {
    let relative = strip_fragment(relative);
    if relative.starts_with('/') {
        return normalize(relative);
    }

    let dir = dirname(base);
    if dir.is_empty() {
        normalize(relative)
    } else {
        normalize(&format!("{dir}/{relative}"))
    }
}

/// Normalize `.` and `..` segments.
///
/// `..` at the root is ignored rather than treated as an error, so
/// `normalize("..")` is the empty string.
pub fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }
    stack.join("/")
}

/// Last segment of a path.
pub fn basename(path: &str) -> &str {
    let path = strip_fragment(path);
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Directory portion of a path, without the trailing slash.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Find the manifest entry whose normalized href equals `key`.
///
/// Manifest hrefs are relative to the package document at `opf_path`, while
/// `key` is an archive path. The first match in iteration order wins; since
/// the manifest is a hash map, two items normalizing to the same path
/// resolve in unspecified order.
pub fn find_in_manifest<'a>(
    manifest: &'a HashMap<String, ManifestItem>,
    opf_path: &str,
    key: &str,
) -> Option<(&'a str, &'a ManifestItem)> {
    let key = normalize(key);
    manifest
        .iter()
        .find(|(_, item)| resolve(opf_path, &item.href) == key)
        .map(|(id, item)| (id.as_str(), item))
}

/// Percent-decode an href (`my%20file.png` → `my file.png`).
pub fn decode(href: &str) -> Cow<'_, str> {
    percent_decode_str(href).decode_utf8_lossy()
}

/// Whether an href points outside the archive.
pub fn is_external(href: &str) -> bool {
    href.contains("://") || href.starts_with("data:") || href.starts_with("mailto:")
}

fn strip_fragment(href: &str) -> &str {
    let end = href.find(['#', '?']).unwrap_or(href.len());
    &href[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a/b/../c"), "a/c");
        assert_eq!(normalize("./x/./y"), "x/y");
        assert_eq!(normalize("a//b/"), "a/b");
    }

    #[test]
    fn test_normalize_parent_past_root_is_empty() {
        assert_eq!(normalize(".."), "");
        assert_eq!(normalize("../../a"), "a");
    }

    #[test]
    fn test_resolve_parent_directory() {
        assert_eq!(
            resolve("OEBPS/text/ch01.xhtml", "../styles/main.css"),
            "OEBPS/styles/main.css"
        );
    }

    #[test]
    fn test_resolve_same_dir() {
        assert_eq!(resolve("OEBPS/ch1.xhtml", "img.png"), "OEBPS/img.png");
        assert_eq!(resolve("ch1.xhtml", "img.png"), "img.png");
    }

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(resolve("OEBPS/ch1.xhtml", "/images/a.png"), "images/a.png");
    }

    #[test]
    fn test_resolve_strips_fragment() {
        assert_eq!(resolve("text/ch1.xhtml", "ch2.xhtml#section"), "text/ch2.xhtml");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("OEBPS/images/a.png"), "a.png");
        assert_eq!(basename("a.png"), "a.png");
        assert_eq!(basename("dir/"), "dir");
        assert_eq!(dirname("OEBPS/images/a.png"), "OEBPS/images");
        assert_eq!(dirname("a.png"), "");
    }

    #[test]
    fn test_find_in_manifest() {
        let mut manifest = HashMap::new();
        manifest.insert(
            "img".to_string(),
            ManifestItem {
                href: "images/../images/a.png".to_string(),
                media_type: "image/png".to_string(),
            },
        );
        let found = find_in_manifest(&manifest, "OEBPS/content.opf", "OEBPS/images/a.png");
        assert_eq!(found.map(|(id, _)| id), Some("img"));
        assert!(find_in_manifest(&manifest, "OEBPS/content.opf", "images/a.png").is_none());
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("my%20file.png"), "my file.png");
        assert_eq!(decode("plain.png"), "plain.png");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(segments in prop::collection::vec(
            prop_oneof![Just("..".to_string()), Just(".".to_string()), "[a-z]{1,4}"],
            0..8,
        )) {
            let path = segments.join("/");
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.split('/').any(|s| s == ".." || s == "."));
        }
    }
}
