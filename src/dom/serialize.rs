//! Serialize a [`Dom`] subtree back to markup.
//!
//! Void elements are self-closed and text/attributes are escaped. The text
//! of `script` and `style` is written raw, so a subtree is well-formed XML
//! only once those elements are removed.

use super::tree::{Dom, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Markup of all children of `id`.
pub fn inner_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                if let Some(prefix) = &attr.name.prefix {
                    out.push_str(prefix.as_ref());
                    out.push(':');
                }
                out.push_str(attr.name.local.as_ref());
                out.push_str("=\"");
                out.push_str(&escape_attr(&attr.value));
                out.push('"');
            }

            if VOID_ELEMENTS.contains(&tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');

            let raw = matches!(tag, "script" | "style");
            for child in dom.children(id) {
                match (raw, dom.text(child)) {
                    (true, Some(text)) => out.push_str(text),
                    _ => write_node(dom, child, out),
                }
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Doctype { .. } => {}
    }
}

/// Escape character data.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&#160;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for double-quoted output.
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::super::parse_html;
    use super::*;

    #[test]
    fn test_void_elements_self_close() {
        let dom = parse_html("<p>a<br>b<img src=\"x.png\"></p>");
        let body = dom.body();
        assert_eq!(inner_html(&dom, body), "<p>a<br/>b<img src=\"x.png\"/></p>");
    }

    #[test]
    fn test_text_is_escaped() {
        let dom = parse_html("<p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>");
        assert_eq!(inner_html(&dom, dom.body()), "<p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>");
    }

    #[test]
    fn test_attr_quotes_escaped() {
        let dom = parse_html(r#"<a title='say "hi"' href="x">t</a>"#);
        assert_eq!(
            inner_html(&dom, dom.body()),
            r#"<a title="say &quot;hi&quot;" href="x">t</a>"#
        );
    }
}
