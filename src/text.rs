//! Readable plain text from a document tree.
//!
//! Non-content subtrees are skipped, block elements become paragraph breaks
//! and whitespace is collapsed:
//!
//! ```
//! use vellum::text::html_to_text;
//!
//! let text = html_to_text("<h1>Title</h1><p>Hello <em>world</em>.</p><script>x()</script>");
//! assert_eq!(text, "Title\n\nHello world.");
//! ```

use crate::dom::{Dom, NodeId, parse_html};

/// Subtrees that never contribute text.
const SKIPPED: &[&str] = &[
    "script", "style", "nav", "header", "footer", "head", "title", "noscript", "template",
];

/// Elements that start and end a paragraph.
const BLOCKS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "ul",
    "ol",
    "table",
    "tr",
    "figure",
    "blockquote",
];

/// Extract readable text from a parsed document. `None` yields `""`.
pub fn extract_readable_text(dom: Option<&Dom>) -> String {
    let Some(dom) = dom else {
        return String::new();
    };

    let mut out = String::new();
    walk(dom, dom.document(), &mut out);
    tidy(&out)
}

/// Parse an HTML fragment and extract its readable text.
pub fn html_to_text(html: &str) -> String {
    let dom = parse_html(html);
    extract_readable_text(Some(&dom))
}

fn walk(dom: &Dom, id: NodeId, out: &mut String) {
    for child in dom.children(id) {
        if let Some(text) = dom.text(child) {
            push_text(out, text);
            continue;
        }

        let Some(tag) = dom.tag(child) else {
            continue;
        };

        if SKIPPED.contains(&tag) {
            continue;
        }

        match tag {
            "br" => out.push('\n'),
            "td" | "th" => {
                push_space(out);
                walk(dom, child, out);
                push_space(out);
            }
            t if BLOCKS.contains(&t) => {
                out.push('\n');
                walk(dom, child, out);
                out.push('\n');
            }
            _ => walk(dom, child, out),
        }
    }
}

/// Append collapsed words, keeping one space where the source had whitespace
/// at either edge.
fn push_text(out: &mut String, raw: &str) {
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() {
        if !raw.is_empty() {
            push_space(out);
        }
        return;
    }

    if raw.starts_with(char::is_whitespace) {
        push_space(out);
    }
    out.push_str(&words.join(" "));
    if raw.ends_with(char::is_whitespace) {
        push_space(out);
    }
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with([' ', '\n']) {
        out.push(' ');
    }
}

/// Strip horizontal whitespace around newlines, cap blank lines at one, trim.
fn tidy(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_matches([' ', '\t'])).collect();

    let mut out = String::with_capacity(raw.len());
    let mut newlines = 0usize;
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            newlines += 1;
        }
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            for _ in 0..newlines.min(2) {
                out.push('\n');
            }
        }
        newlines = 0;
        out.push_str(line);
    }
    out
}
