//! Small helpers shared by the quick-xml pull parsers (OPF, NCX, FB2, ComicInfo).

use quick_xml::events::BytesStart;

/// Strip a UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data)
}

/// Local part of a namespaced name (`dc:title` → `title`).
pub fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Value of the attribute whose local name is `key`, entity-decoded.
pub fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| local_name(a.key.as_ref()) == key)
        .map(|a| unescape(&String::from_utf8_lossy(&a.value)))
}

/// Resolve a general entity reference (`amp`, `#8217`, `#x41`).
pub fn resolve_entity(entity: &str) -> Option<String> {
    let c = match entity {
        "apos" => '\'',
        "quot" => '"',
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "nbsp" => '\u{a0}',
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(c.to_string())
}

/// Replace entity references in raw attribute text. Unknown ones are kept verbatim.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(';').and_then(|end| Some((end, resolve_entity(&after[..end])?))) {
            Some((end, resolved)) => {
                out.push_str(&resolved);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;
    use quick_xml::events::Event;

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(&[0xEF, 0xBB, 0xBF, b'h', b'i']), b"hi");
        assert_eq!(strip_bom(b"hello"), b"hello");
        assert_eq!(strip_bom(&[0xEF, 0xBB, b'x']), &[0xEF, 0xBB, b'x']);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"dc:title"), b"title");
        assert_eq!(local_name(b"l:href"), b"href");
        assert_eq!(local_name(b"title"), b"title");
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp").as_deref(), Some("&"));
        assert_eq!(resolve_entity("#8217").as_deref(), Some("\u{2019}"));
        assert_eq!(resolve_entity("#x41").as_deref(), Some("A"));
        assert_eq!(resolve_entity("bogus"), None);
    }

    #[test]
    fn test_attr_by_local_name() {
        let mut reader = Reader::from_str(r##"<image l:href="#cover&amp;x"/>"##);
        let Ok(Event::Empty(e)) = reader.read_event() else {
            panic!("expected empty element");
        };
        assert_eq!(attr(&e, b"href").as_deref(), Some("#cover&x"));
        assert_eq!(attr(&e, b"src"), None);
    }

    #[test]
    fn test_unescape_keeps_unknown() {
        assert_eq!(unescape("a &foo; b &lt; c"), "a &foo; b < c");
        assert_eq!(unescape("trailing &"), "trailing &");
    }
}
