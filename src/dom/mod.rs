//! HTML parsing into a navigable tree.
//!
//! Documents are parsed with html5ever into an arena ([`Dom`]), queried by
//! tag, walked in document order, edited in place (attribute rewrites,
//! element removal) and serialized back to well-formed markup.
//!
//! ```
//! use vellum::dom::parse_html;
//!
//! let dom = parse_html("<html><head><title>T</title></head><body><p>Hi</p></body></html>");
//! assert_eq!(dom.title().as_deref(), Some("T"));
//! assert_eq!(dom.body_inner_html(), "<p>Hi</p>");
//! ```

mod serialize;
mod sink;
mod tree;

pub use serialize::{escape_attr, escape_text, inner_html};
pub use tree::{Attribute, Dom, Node, NodeData, NodeId};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use sink::DomSink;

/// Parse an HTML (or lenient XHTML) string.
pub fn parse_html(html: &str) -> Dom {
    parse_document(DomSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse HTML bytes, detecting the text encoding first.
pub fn parse_html_bytes(bytes: &[u8]) -> Dom {
    let hint = crate::util::extract_xml_encoding(bytes);
    let html = crate::util::decode_text(bytes, hint);
    parse_html(&html)
}

impl Dom {
    /// The `<body>` element, or the document root when there is none.
    pub fn body(&self) -> NodeId {
        self.find_by_tag("body").unwrap_or_else(|| self.document())
    }

    /// Serialized content of `<body>`.
    pub fn body_inner_html(&self) -> String {
        inner_html(self, self.body())
    }

    /// Trimmed text of the first `<title>`, if non-empty.
    pub fn title(&self) -> Option<String> {
        let title = self.find_by_tag("title")?;
        let text = collapse_whitespace(&self.text_content(title));
        (!text.is_empty()).then_some(text)
    }

    /// Trimmed text of the first `h1`–`h3` under `<body>`, if non-empty.
    pub fn first_heading(&self) -> Option<String> {
        let heading = self
            .descendants(self.body())
            .find(|&id| matches!(self.tag(id), Some("h1" | "h2" | "h3")))?;
        let text = collapse_whitespace(&self.text_content(heading));
        (!text.is_empty()).then_some(text)
    }

    /// Remove every element with one of the given tag names.
    pub fn remove_tags(&mut self, tags: &[&str]) {
        let doomed: Vec<_> = self
            .descendants(self.document())
            .filter(|&id| self.tag(id).is_some_and(|t| tags.contains(&t)))
            .collect();
        for id in doomed {
            self.detach(id);
        }
    }

    /// Rewrite an attribute on every element with the given tag.
    ///
    /// `rewrite` returns the new value, or `None` to leave it unchanged.
    pub fn rewrite_attr<F>(&mut self, tag: &str, attr: &str, mut rewrite: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        let targets = self.find_all_by_tag(self.document(), tag);
        for id in targets {
            let new_value = self.get_attr(id, attr).and_then(&mut rewrite);
            if let Some(value) = new_value {
                self.set_attr(id, attr, value);
            }
        }
    }

    /// Point a reference attribute on every `tag` element at what `resolve`
    /// returns, detaching the elements it cannot resolve.
    pub fn relink_or_remove<F>(&mut self, tag: &str, attr: &str, mut resolve: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        let targets = self.find_all_by_tag(self.document(), tag);
        for id in targets {
            match self.get_attr(id, attr).and_then(&mut resolve) {
                Some(value) => self.set_attr(id, attr, value),
                None => self.detach(id),
            }
        }
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
